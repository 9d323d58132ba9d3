//! Shared AST queries for rules: static evaluation, global tracking, token lookup.

use crate::ast::{AttrValue, Ast, Node, Span};
use crate::semantic::{DefinitionKind, ScopeManager, Variable};
use crate::source_code::SourceCode;

/// Globals that alias the global object.
pub const GLOBAL_OBJECTS: &[&str] = &["globalThis", "global", "self", "window"];

const MAX_STATIC_DEPTH: usize = 16;

/// String value of `node` when it can be computed without running code.
///
/// Handles string and number literals, templates whose substitutions are static,
/// `+` concatenation and identifiers bound by a `const` declaration.
pub fn static_string(node: Node<'_>, scopes: &ScopeManager) -> Option<String> {
    evaluate(node, scopes, 0)
}

fn evaluate(node: Node<'_>, scopes: &ScopeManager, depth: usize) -> Option<String> {
    if depth > MAX_STATIC_DEPTH {
        return None;
    }
    let node = node.skip_parens();
    match node.kind() {
        "Literal" => {
            if node.has_attr_prefix("regex") {
                return None;
            }
            node.attr("value").map(AttrValue::to_string)
        }
        "TemplateLiteral" => {
            let mut out = String::new();
            let mut expressions = node.children_in("expressions");
            for quasi in node.children_in("quasis") {
                out.push_str(&cook_template(quasi.str_attr("value.raw")?)?);
                if !quasi.bool_attr("tail") {
                    out.push_str(&evaluate(expressions.next()?, scopes, depth + 1)?);
                }
            }
            Some(out)
        }
        "BinaryExpression" if node.str_attr("operator") == Some("+") => {
            let left = evaluate(node.child("left")?, scopes, depth + 1)?;
            let right = evaluate(node.child("right")?, scopes, depth + 1)?;
            Some(left + right.as_str())
        }
        "Identifier" => {
            let init = const_initializer(node, scopes)?;
            evaluate(init, scopes, depth + 1)
        }
        _ => None,
    }
}

/// Initializer of the `const` declaration `identifier` refers to.
fn const_initializer<'a>(identifier: Node<'a>, scopes: &ScopeManager) -> Option<Node<'a>> {
    let ast = identifier.ast();
    let reference = scopes.reference_at(identifier.id())?;
    let variable = scopes.variable(reference.resolved?);
    let [def] = variable.defs.as_slice() else {
        return None;
    };
    if def.kind != DefinitionKind::Variable {
        return None;
    }
    let declaration = ast.node(def.parent?);
    if declaration.str_attr("kind") != Some("const") {
        return None;
    }
    let name = ast.node(def.name);
    let declarator = ast.node(def.node);
    if name.parent() != Some(declarator) || name.field() != Some("id") {
        return None;
    }
    declarator.child("init")
}

/// Cooked value of raw template text; `None` for escapes a template cannot cook.
pub fn cook_template(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                chars.next_if_eq(&'\n');
                out.push('\n');
            }
            '\\' => {
                let escaped = chars.next()?;
                match escaped {
                    'n' => out.push('\n'),
                    't' => out.push('\t'),
                    'r' => out.push('\r'),
                    'b' => out.push('\u{8}'),
                    'f' => out.push('\u{c}'),
                    'v' => out.push('\u{b}'),
                    '0' if !chars.peek().is_some_and(char::is_ascii_digit) => out.push('\0'),
                    '0'..='9' => return None,
                    '\n' | '\u{2028}' | '\u{2029}' => {}
                    '\r' => {
                        chars.next_if_eq(&'\n');
                    }
                    'x' => {
                        let digits: String = (0..2).filter_map(|_| chars.next()).collect();
                        let value = u32::from_str_radix(&digits, 16).ok().filter(|_| digits.len() == 2)?;
                        out.push(char::from_u32(value)?);
                    }
                    'u' => out.push_str(&cook_unicode_escape(&mut chars)?),
                    other => out.push(other),
                }
            }
            other => out.push(other),
        }
    }
    Some(out)
}

fn cook_unicode_escape(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<String> {
    let read_code_unit = |chars: &mut std::iter::Peekable<std::str::Chars<'_>>| {
        if chars.next_if_eq(&'{').is_some() {
            let digits: String = std::iter::from_fn(|| chars.next_if(|c| *c != '}')).collect();
            chars.next_if_eq(&'}')?;
            u32::from_str_radix(&digits, 16).ok().filter(|v| *v <= 0x10FFFF)
        } else {
            let digits: String = (0..4).filter_map(|_| chars.next()).collect();
            u32::from_str_radix(&digits, 16).ok().filter(|_| digits.len() == 4)
        }
    };

    let lead = read_code_unit(chars)?;
    if (0xD800..=0xDBFF).contains(&lead) {
        let mut lookahead = chars.clone();
        if lookahead.next() == Some('\\') && lookahead.next() == Some('u') {
            if let Some(trail) = read_code_unit(&mut lookahead).filter(|t| (0xDC00..=0xDFFF).contains(t)) {
                *chars = lookahead;
                let combined = (lead - 0xD800) * 0x400 + (trail - 0xDC00) + 0x10000;
                return char::from_u32(combined).map(String::from);
            }
        }
    }
    // Lone surrogates cannot live in a Rust string.
    Some(char::from_u32(lead).map_or_else(|| '\u{FFFD}'.to_string(), String::from))
}

/// The global `name` when it is a configured global nobody declares or assigns.
pub fn unmodified_global<'m>(scopes: &'m ScopeManager, name: &str) -> Option<&'m Variable> {
    let global = scopes.global_scope();
    let variable = scopes.variable(*global.set.get(name)?);
    let modified = !variable.defs.is_empty()
        || scopes.references_of(variable.id).any(|reference| reference.is_write());
    (!modified).then_some(variable)
}

/// Calls and `new` expressions whose callee is the global `name`, directly or as a
/// member of a global object such as `globalThis`. Sorted by position.
pub fn global_calls<'a>(ast: &'a Ast, scopes: &ScopeManager, name: &str) -> Vec<Node<'a>> {
    let mut calls = Vec::new();

    if let Some(variable) = unmodified_global(scopes, name) {
        for reference in scopes.references_of(variable.id) {
            let identifier = ast.node(reference.identifier);
            if let Some(call) = call_with_callee(identifier) {
                calls.push(call);
            }
        }
    }

    for object_name in GLOBAL_OBJECTS {
        let Some(object) = unmodified_global(scopes, object_name) else {
            continue;
        };
        for reference in scopes.references_of(object.id) {
            let identifier = ast.node(reference.identifier);
            let Some((member, _)) = identifier.parent_skip_parens() else {
                continue;
            };
            if member.is("MemberExpression")
                && member.child("object").map(Node::skip_parens) == Some(identifier)
                && property_name(member) == Some(name)
            {
                if let Some(call) = call_with_callee(member) {
                    calls.push(call);
                }
            }
        }
    }

    calls.sort_by_key(|call| call.start());
    calls.dedup();
    calls
}

fn call_with_callee(callee: Node<'_>) -> Option<Node<'_>> {
    let (parent, wrapper) = callee.parent_skip_parens()?;
    let is_call = parent.is("CallExpression") || parent.is("NewExpression");
    (is_call && wrapper.field() == Some("callee")).then_some(parent)
}

/// Static property name of a member expression: `a.b`, `a["b"]` or ``a[`b`]``.
pub fn property_name<'a>(member: Node<'a>) -> Option<&'a str> {
    let property = member.child("property")?;
    if !member.bool_attr("computed") {
        return property.name();
    }
    let property = property.skip_parens();
    if let Some(value) = property.string_value() {
        return Some(value);
    }
    if property.is("TemplateLiteral") && property.children_in("expressions").next().is_none() {
        return property.child("quasis")?.str_attr("value.raw");
    }
    None
}

/// Span of the first `punctuator` token inside `range`.
pub fn find_token(source: &SourceCode, range: Span, punctuator: &str) -> Option<Span> {
    source
        .tokens_in(range)
        .iter()
        .find(|token| token.is_punctuator(punctuator))
        .map(|token| token.span)
}
