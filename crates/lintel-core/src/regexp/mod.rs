//! ECMAScript regular-expression pattern validation.
//!
//! [`parse_pattern`] checks a pattern the way a JavaScript engine of the given
//! edition would, in Unicode mode (`u` flag) or in the legacy grammar of Annex B,
//! and returns the elements of every character class it contains.
//!
//! The `v` flag reads like `u` and additionally accepts class set syntax; nested
//! classes are reported as classes of their own.
//!
//! Without the `u` flag a pattern is read as UTF-16 code units, so an astral
//! character yields two surrogate [`ClassElement::Character`]s.

mod parser;

use std::sync::LazyLock;

use regex::Regex;

static COMBINING_MARK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{Mn}\p{Mc}\p{Me}]$").expect("Invalid regex pattern"));

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid regular expression: /{pattern}/: {message}")]
pub struct RegExpSyntaxError {
    pub pattern: String,
    /// Position in the pattern, in code units of the parse mode.
    pub index: usize,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternOptions {
    pub unicode: bool,
    /// `v` flag: class set operations, nested classes and `\q{…}` strings.
    pub unicode_sets: bool,
    pub ecma_version: u32,
}

impl PatternOptions {
    pub fn new(unicode: bool, ecma_version: u32) -> Self {
        Self {
            unicode,
            unicode_sets: false,
            ecma_version,
        }
    }

    /// Mode implied by a flags string. Both `u` and `v` read the pattern by code point.
    pub fn from_flags(flags: &str, ecma_version: u32) -> Self {
        let unicode_sets = flags.contains('v');
        Self {
            unicode: unicode_sets || flags.contains('u'),
            unicode_sets,
            ecma_version,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassElement {
    /// A single code point, or a UTF-16 code unit outside Unicode mode.
    Character(u32),
    Range { min: u32, max: u32 },
    /// `\d`, `\w`, `\s`, `\p{…}` and their negations.
    Set,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterClass {
    pub negated: bool,
    pub elements: Vec<ClassElement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Pattern {
    /// Character classes in source order.
    pub classes: Vec<CharacterClass>,
    pub group_count: usize,
    pub group_names: Vec<String>,
}

pub fn parse_pattern(source: &str, options: PatternOptions) -> Result<Pattern, RegExpSyntaxError> {
    parser::RegExpParser::new(source, options).parse()
}

/// Whether `source` is a valid pattern with these options.
pub fn is_valid_pattern(source: &str, options: PatternOptions) -> bool {
    parse_pattern(source, options).is_ok()
}

pub fn is_combining_character(code_point: u32) -> bool {
    let Some(c) = char::from_u32(code_point) else {
        return false;
    };
    let mut buffer = [0u8; 4];
    COMBINING_MARK.is_match(c.encode_utf8(&mut buffer))
}

pub fn is_emoji_modifier(code_point: u32) -> bool {
    (0x1F3FB..=0x1F3FF).contains(&code_point)
}

pub fn is_regional_indicator_symbol(code_point: u32) -> bool {
    (0x1F1E6..=0x1F1FF).contains(&code_point)
}

pub fn is_surrogate_pair(lead: u32, trail: u32) -> bool {
    (0xD800..=0xDBFF).contains(&lead) && (0xDC00..=0xDFFF).contains(&trail)
}
