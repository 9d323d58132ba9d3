//! no-misleading-character-class: disallow characters made of several code points
//! inside a character class.
//!
//! `/^[A\u0301]$/` matches `A` or the combining accent, never the accented letter. The rule
//! looks at regex literals and at `RegExp(...)` / `new RegExp(...)` calls whose
//! pattern can be evaluated statically, and reports each kind of misleading sequence
//! once per expression.

use serde_json::json;

use crate::ast::Node;
use crate::config::LATEST_ECMA_VERSION;
use crate::declare_rule;
use crate::diagnostic::Edit;
use crate::regexp::{
    ClassElement, PatternOptions, is_combining_character, is_emoji_modifier, is_regional_indicator_symbol,
    is_surrogate_pair, is_valid_pattern, parse_pattern,
};
use crate::rules::helpers::{global_calls, static_string};
use crate::rules::{Listeners, Report, Rule, RuleContext, RuleMeta, Suggest};
use crate::source_code::SourceCode;

declare_rule!(
    NoMisleadingCharacterClass,
    name = "no-misleading-character-class",
    rule_type = Problem,
    description = "Disallow characters which are made with multiple code points in character class syntax",
    messages = [
        ("surrogatePairWithoutUFlag", "Unexpected surrogate pair in character class. Use 'u' flag."),
        ("combiningClass", "Unexpected combined character in character class."),
        ("emojiModifier", "Unexpected modified Emoji in character class."),
        ("regionalIndicatorSymbol", "Unexpected national flag in character class."),
        ("zwj", "Unexpected joined character sequence in character class."),
        ("suggestUnicodeFlag", "Add unicode 'u' flag to regex."),
    ],
    has_suggestions = true,
    schema = json!([]),
    docs_url = "https://eslint.org/docs/latest/rules/no-misleading-character-class",
);

const ZWJ: u32 = 0x200D;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    SurrogatePairWithoutUFlag,
    CombiningClass,
    EmojiModifier,
    RegionalIndicatorSymbol,
    Zwj,
}

impl Kind {
    const ALL: [Kind; 5] = [
        Kind::SurrogatePairWithoutUFlag,
        Kind::CombiningClass,
        Kind::EmojiModifier,
        Kind::RegionalIndicatorSymbol,
        Kind::Zwj,
    ];

    fn message_id(self) -> &'static str {
        match self {
            Kind::SurrogatePairWithoutUFlag => "surrogatePairWithoutUFlag",
            Kind::CombiningClass => "combiningClass",
            Kind::EmojiModifier => "emojiModifier",
            Kind::RegionalIndicatorSymbol => "regionalIndicatorSymbol",
            Kind::Zwj => "zwj",
        }
    }

    fn is_found_in(self, chars: &[u32]) -> bool {
        let last = chars.len().saturating_sub(1);
        chars.iter().enumerate().skip(1).any(|(i, &c)| {
            let prev = chars[i - 1];
            match self {
                Kind::SurrogatePairWithoutUFlag => is_surrogate_pair(prev, c),
                Kind::CombiningClass => is_combining_character(c) && !is_combining_character(prev),
                Kind::EmojiModifier => is_emoji_modifier(c) && !is_emoji_modifier(prev),
                Kind::RegionalIndicatorSymbol => {
                    is_regional_indicator_symbol(c) && is_regional_indicator_symbol(prev)
                }
                Kind::Zwj => i != last && c == ZWJ && prev != ZWJ && chars[i + 1] != ZWJ,
            }
        })
    }
}

/// Runs of adjacent characters in a class. A range ends one run with its minimum and
/// starts the next with its maximum; a set breaks the run.
fn character_sequences(elements: &[ClassElement]) -> Vec<Vec<u32>> {
    let mut sequences = Vec::new();
    let mut current = Vec::new();
    for element in elements {
        match *element {
            ClassElement::Character(c) => current.push(c),
            ClassElement::Range { min, max } => {
                current.push(min);
                sequences.push(std::mem::replace(&mut current, vec![max]));
            }
            ClassElement::Set => {
                if !current.is_empty() {
                    sequences.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        sequences.push(current);
    }
    sequences
}

/// Kinds present in `pattern`, in order of first detection. Invalid patterns have none.
fn find_kinds(pattern: &str, flags: &str) -> Vec<Kind> {
    let options = PatternOptions::from_flags(flags, LATEST_ECMA_VERSION);
    let Ok(parsed) = parse_pattern(pattern, options) else {
        return Vec::new();
    };

    let mut found = Vec::new();
    for class in &parsed.classes {
        for sequence in character_sequences(&class.elements) {
            for kind in Kind::ALL {
                if !found.contains(&kind) && kind.is_found_in(&sequence) {
                    found.push(kind);
                }
            }
        }
    }
    found
}

impl Rule for NoMisleadingCharacterClass {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn create<'a>(&'a self, _ctx: &RuleContext<'a>) -> Listeners<'a> {
        Listeners::new()
            .on_start(|_, ctx| {
                let scopes = ctx.scope_manager();
                for call in global_calls(ctx.ast(), scopes, "RegExp") {
                    let mut arguments = call.children_in("arguments");
                    let Some(pattern_node) = arguments.next() else {
                        continue;
                    };
                    let flags_node = arguments.next();
                    let Some(pattern) = static_string(pattern_node, scopes) else {
                        continue;
                    };
                    let flags = flags_node
                        .and_then(|node| static_string(node, scopes))
                        .unwrap_or_default();

                    let edit = unicode_flag_for_call(ctx.source_code(), call, pattern_node, flags_node);
                    verify(ctx, call, &pattern, &flags, edit);
                }
            })
            .on("Literal[regex]", |node, ctx| {
                let (Some(pattern), Some(flags)) =
                    (node.str_attr("regex.pattern"), node.str_attr("regex.flags"))
                else {
                    return;
                };
                verify(ctx, node, pattern, flags, Some(Edit::insert(node.end(), "u")));
            })
    }
}

fn verify<'a>(ctx: &RuleContext<'a>, node: Node<'a>, pattern: &str, flags: &str, edit: Option<Edit>) {
    let kinds = find_kinds(pattern, flags);
    if kinds.is_empty() {
        return;
    }

    let ecma_version = ctx.language_options().ecma_version;
    let can_add_flag = ecma_version >= 2015
        && !flags.contains('v')
        && is_valid_pattern(pattern, PatternOptions::new(true, ecma_version));
    let mut edit = edit.filter(|_| can_add_flag);

    for kind in kinds {
        let mut report = Report::node(node).message_id(kind.message_id());
        if kind == Kind::SurrogatePairWithoutUFlag {
            if let Some(edit) = edit.take() {
                report = report.suggest(Suggest::message_id("suggestUnicodeFlag", move |_| edit));
            }
        }
        ctx.report(report);
    }
}

/// Edit adding `u` to the flags of a `RegExp` call, if the flags argument allows it.
fn unicode_flag_for_call(
    source: &SourceCode,
    call: Node<'_>,
    pattern_node: Node<'_>,
    flags_node: Option<Node<'_>>,
) -> Option<Edit> {
    let Some(flags_node) = flags_node else {
        let closing = source.last_token(call).filter(|token| token.is_punctuator(")"))?;
        let before = source.token_before(closing.span.start)?;
        if before.is_punctuator(",") {
            return Some(Edit::insert(before.span.end, " \"u\","));
        }
        return Some(Edit::insert(pattern_node.end(), ", \"u\""));
    };

    let flags_node = flags_node.skip_parens();
    let is_string = flags_node.string_value().is_some();
    if is_string || flags_node.is("TemplateLiteral") {
        return Some(Edit::insert(flags_node.end() - 1, "u"));
    }
    None
}
