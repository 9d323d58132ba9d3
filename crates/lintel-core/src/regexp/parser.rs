use regex::Regex;

use super::{CharacterClass, ClassElement, Pattern, PatternOptions, RegExpSyntaxError};

const SYNTAX_CHARACTERS: &str = "^$\\.*+?()[]{}|";

/// Unescaped, these are errors inside a `v`-mode class.
const CLASS_SET_SYNTAX_CHARACTERS: &str = "()[]{}/-|";

/// May be escaped inside a `v`-mode class.
const CLASS_SET_RESERVED_PUNCTUATORS: &str = "&-!#%,:;<=>@`~";

/// Reserved when doubled inside a `v`-mode class.
const CLASS_SET_RESERVED_DOUBLES: &str = "!#$%*+,.:;<=>?@^`~";

const PROPERTY_NAMES: &[&str] = &[
    "General_Category",
    "gc",
    "Script",
    "sc",
    "Script_Extensions",
    "scx",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Assertion {
    Edge,
    Lookahead,
    Lookbehind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClassAtom {
    Character(u32),
    Set,
}

pub(crate) struct RegExpParser<'s> {
    source: &'s str,
    units: Vec<u32>,
    pos: usize,
    unicode: bool,
    unicode_sets: bool,
    ecma_version: u32,
    group_count: usize,
    has_named_groups: bool,
    group_names: Vec<String>,
    backreference_names: Vec<String>,
    classes: Vec<CharacterClass>,
}

type ParseResult<T> = Result<T, RegExpSyntaxError>;

fn is_syntax_character(unit: u32) -> bool {
    char::from_u32(unit).is_some_and(|c| SYNTAX_CHARACTERS.contains(c))
}

fn is_decimal_digit(unit: u32) -> bool {
    (u32::from('0')..=u32::from('9')).contains(&unit)
}

fn is_octal_digit(unit: u32) -> bool {
    (u32::from('0')..=u32::from('7')).contains(&unit)
}

fn hex_value(unit: u32) -> Option<u32> {
    char::from_u32(unit).and_then(|c| c.to_digit(16))
}

fn is_ascii_letter(unit: u32) -> bool {
    char::from_u32(unit).is_some_and(|c| c.is_ascii_alphabetic())
}

fn is_lead_surrogate(unit: u32) -> bool {
    (0xD800..=0xDBFF).contains(&unit)
}

fn is_trail_surrogate(unit: u32) -> bool {
    (0xDC00..=0xDFFF).contains(&unit)
}

fn is_id_start(unit: u32) -> bool {
    char::from_u32(unit).is_some_and(|c| c == '$' || c == '_' || c.is_alphabetic())
}

fn is_id_continue(unit: u32) -> bool {
    char::from_u32(unit)
        .is_some_and(|c| c == '$' || c == '\u{200C}' || c == '\u{200D}' || c == '_' || c.is_alphanumeric())
}

impl<'s> RegExpParser<'s> {
    pub fn new(source: &'s str, options: PatternOptions) -> Self {
        let units = if options.unicode {
            source.chars().map(u32::from).collect()
        } else {
            source.encode_utf16().map(u32::from).collect()
        };
        Self {
            source,
            units,
            pos: 0,
            unicode: options.unicode,
            unicode_sets: options.unicode_sets,
            ecma_version: options.ecma_version,
            group_count: 0,
            has_named_groups: false,
            group_names: Vec::new(),
            backreference_names: Vec::new(),
            classes: Vec::new(),
        }
    }

    pub fn parse(mut self) -> ParseResult<Pattern> {
        self.prescan();
        self.disjunction()?;

        if let Some(unit) = self.peek() {
            if unit == u32::from(')') {
                return Err(self.error("Unmatched ')'"));
            }
            if unit == u32::from('\\') {
                return Err(self.error("\\ at end of pattern"));
            }
            if unit == u32::from(']') || unit == u32::from('}') {
                return Err(self.error("Lone quantifier brackets"));
            }
            return Err(self.error("Unexpected character"));
        }

        if let Some(name) = self
            .backreference_names
            .iter()
            .find(|name| !self.group_names.contains(name))
        {
            let message = format!("Invalid named capture referenced: {}", name);
            return Err(self.error(&message));
        }

        Ok(Pattern {
            classes: self.classes,
            group_count: self.group_count,
            group_names: self.group_names,
        })
    }

    /// Counts capturing groups ahead of parsing so backreferences can be checked.
    fn prescan(&mut self) {
        let mut in_class = false;
        let mut index = 0;
        while index < self.units.len() {
            let unit = self.units[index];
            if unit == u32::from('\\') {
                index += 2;
                continue;
            }
            if in_class {
                in_class = unit != u32::from(']');
            } else if unit == u32::from('[') {
                in_class = true;
            } else if unit == u32::from('(') {
                let next = self.units.get(index + 1).copied();
                if next != Some(u32::from('?')) {
                    self.group_count += 1;
                } else if self.ecma_version >= 2018
                    && self.units.get(index + 2).copied() == Some(u32::from('<'))
                    && !matches!(
                        self.units.get(index + 3).copied(),
                        Some(u) if u == u32::from('=') || u == u32::from('!')
                    )
                {
                    self.group_count += 1;
                    self.has_named_groups = true;
                }
            }
            index += 1;
        }
    }

    fn error(&self, message: &str) -> RegExpSyntaxError {
        RegExpSyntaxError {
            pattern: self.source.to_string(),
            index: self.pos,
            message: message.to_string(),
        }
    }

    fn peek(&self) -> Option<u32> {
        self.units.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u32> {
        self.units.get(self.pos + offset).copied()
    }

    fn at(&self, c: char) -> bool {
        self.peek() == Some(u32::from(c))
    }

    fn at_offset(&self, offset: usize, c: char) -> bool {
        self.peek_at(offset) == Some(u32::from(c))
    }

    fn eat(&mut self, c: char) -> bool {
        if self.at(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn next_unit(&mut self) -> Option<u32> {
        let unit = self.peek()?;
        self.pos += 1;
        Some(unit)
    }

    fn disjunction(&mut self) -> ParseResult<()> {
        self.alternative()?;
        while self.eat('|') {
            self.alternative()?;
        }
        Ok(())
    }

    fn alternative(&mut self) -> ParseResult<()> {
        while self.pos < self.units.len() && !self.at(')') && !self.at('|') {
            self.term()?;
        }
        Ok(())
    }

    fn term(&mut self) -> ParseResult<()> {
        if let Some(assertion) = self.assertion()? {
            if assertion == Assertion::Lookahead && !self.unicode {
                self.quantifier()?;
            }
            return Ok(());
        }

        let consumed = if self.unicode {
            self.atom()?
        } else {
            self.extended_atom()?
        };
        if consumed {
            self.quantifier()?;
            return Ok(());
        }

        match self.peek().and_then(char::from_u32) {
            Some('*' | '+' | '?') => Err(self.error("Nothing to repeat")),
            Some('{') if self.unicode => Err(self.error("Lone quantifier brackets")),
            Some('{') => Err(self.error("Nothing to repeat")),
            Some(']' | '}') => Err(self.error("Lone quantifier brackets")),
            _ => Err(self.error("Unexpected character")),
        }
    }

    fn assertion(&mut self) -> ParseResult<Option<Assertion>> {
        let start = self.pos;
        if self.eat('^') || self.eat('$') {
            return Ok(Some(Assertion::Edge));
        }
        if self.at('\\') && (self.at_offset(1, 'b') || self.at_offset(1, 'B')) {
            self.pos += 2;
            return Ok(Some(Assertion::Edge));
        }
        if self.at('(') && self.at_offset(1, '?') {
            let lookbehind =
                self.ecma_version >= 2018 && self.at_offset(2, '<');
            let marker = if lookbehind { 3 } else { 2 };
            if self.at_offset(marker, '=') || self.at_offset(marker, '!') {
                self.pos += marker + 1;
                self.disjunction()?;
                if !self.eat(')') {
                    return Err(self.error("Unterminated group"));
                }
                return Ok(Some(if lookbehind {
                    Assertion::Lookbehind
                } else {
                    Assertion::Lookahead
                }));
            }
        }
        self.pos = start;
        Ok(None)
    }

    fn quantifier(&mut self) -> ParseResult<()> {
        let start = self.pos;
        if self.eat('*') || self.eat('+') || self.eat('?') {
            self.eat('?');
            return Ok(());
        }
        if self.at('{') {
            match self.braced_quantifier() {
                Some((min, max)) => {
                    if max.is_some_and(|max| max < min) {
                        return Err(self.error("numbers out of order in {} quantifier"));
                    }
                    self.eat('?');
                }
                None if self.unicode => {
                    self.pos = start;
                    return Err(self.error("Incomplete quantifier"));
                }
                None => self.pos = start,
            }
        }
        Ok(())
    }

    /// `{n}`, `{n,}` or `{n,m}`; leaves the position untouched when absent.
    fn braced_quantifier(&mut self) -> Option<(u64, Option<u64>)> {
        let start = self.pos;
        if !self.eat('{') {
            return None;
        }
        let parsed = self.quantifier_bounds();
        if parsed.is_none() {
            self.pos = start;
        }
        parsed
    }

    fn quantifier_bounds(&mut self) -> Option<(u64, Option<u64>)> {
        let min = self.decimal()?;
        let max = if self.eat(',') {
            if self.at('}') {
                None
            } else {
                Some(self.decimal()?)
            }
        } else {
            Some(min)
        };
        self.eat('}').then_some((min, max))
    }

    fn decimal(&mut self) -> Option<u64> {
        let start = self.pos;
        let mut value: u64 = 0;
        while let Some(unit) = self.peek().filter(|u| is_decimal_digit(*u)) {
            value = value.saturating_mul(10).saturating_add(u64::from(unit - u32::from('0')));
            self.pos += 1;
        }
        (self.pos > start).then_some(value)
    }

    fn atom(&mut self) -> ParseResult<bool> {
        match self.peek().and_then(char::from_u32) {
            None => Ok(false),
            Some('.') => {
                self.pos += 1;
                Ok(true)
            }
            Some('\\') => {
                self.pos += 1;
                self.atom_escape()?;
                Ok(true)
            }
            Some('[') => {
                self.class()?;
                Ok(true)
            }
            Some('(') => {
                self.group()?;
                Ok(true)
            }
            Some(c) if SYNTAX_CHARACTERS.contains(c) => Ok(false),
            Some(_) => {
                self.pos += 1;
                Ok(true)
            }
        }
    }

    fn extended_atom(&mut self) -> ParseResult<bool> {
        match self.peek().and_then(char::from_u32) {
            Some('\\') => {
                self.pos += 1;
                // A `\c` without a control letter is a literal backslash; the `c`
                // is read as the next atom.
                self.atom_escape()?;
                Ok(true)
            }
            Some('{') => {
                let start = self.pos;
                if self.braced_quantifier().is_some() {
                    self.pos = start;
                    return Err(self.error("Nothing to repeat"));
                }
                self.pos += 1;
                Ok(true)
            }
            Some(']' | '}') => {
                self.pos += 1;
                Ok(true)
            }
            _ => self.atom(),
        }
    }

    /// Parses the escape after a consumed `\`. Returns `false` for a lone `\c`,
    /// which is left unconsumed.
    fn atom_escape(&mut self) -> ParseResult<bool> {
        let Some(unit) = self.peek() else {
            return Err(self.error("\\ at end of pattern"));
        };

        if is_decimal_digit(unit) && unit != u32::from('0') {
            let start = self.pos;
            if let Some(n) = self.decimal() {
                if self.unicode || (n as usize) <= self.group_count {
                    if (n as usize) > self.group_count {
                        return Err(self.error("Invalid escape"));
                    }
                    return Ok(true);
                }
            }
            self.pos = start;
        }

        if unit == u32::from('k') && (self.unicode || self.has_named_groups) {
            self.pos += 1;
            if !self.eat('<') {
                return Err(self.error("Invalid named reference"));
            }
            let name = self.group_name()?;
            self.backreference_names.push(name);
            return Ok(true);
        }

        if self.character_class_escape()? {
            return Ok(true);
        }

        Ok(self.character_escape(false)?.is_some())
    }

    fn character_class_escape(&mut self) -> ParseResult<bool> {
        match self.peek().and_then(char::from_u32) {
            Some('d' | 'D' | 's' | 'S' | 'w' | 'W') => {
                self.pos += 1;
                Ok(true)
            }
            Some('p' | 'P') if self.unicode && self.ecma_version >= 2018 => {
                self.pos += 1;
                self.property_escape()?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn property_escape(&mut self) -> ParseResult<()> {
        if !self.eat('{') {
            return Err(self.error("Invalid property name"));
        }
        let start = self.pos;
        while let Some(c) = self.peek().and_then(char::from_u32) {
            if c.is_ascii_alphanumeric() || c == '_' || c == '=' {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text: String = self.units[start..self.pos]
            .iter()
            .filter_map(|u| char::from_u32(*u))
            .collect();
        if !self.eat('}') {
            return Err(self.error("Invalid property name"));
        }

        let valid = match text.split_once('=') {
            Some((name, value)) => {
                PROPERTY_NAMES.contains(&name) && !value.is_empty() && !value.contains('=')
                    && Regex::new(&format!(r"\p{{{}={}}}", name, value)).is_ok()
            }
            None => !text.is_empty() && Regex::new(&format!(r"\p{{{}}}", text)).is_ok(),
        };
        if valid {
            Ok(())
        } else {
            Err(self.error("Invalid property name"))
        }
    }

    /// A character escape after `\`, returning its value. `None` means a lone `\c`
    /// outside Unicode mode, with nothing consumed.
    fn character_escape(&mut self, in_class: bool) -> ParseResult<Option<u32>> {
        let start = self.pos;
        let Some(unit) = self.next_unit() else {
            return Err(self.error("\\ at end of pattern"));
        };
        let Some(c) = char::from_u32(unit) else {
            // Lone surrogate as identity escape.
            if self.unicode {
                return Err(self.error("Invalid escape"));
            }
            return Ok(Some(unit));
        };

        let value = match c {
            'f' => 0x0C,
            'n' => 0x0A,
            'r' => 0x0D,
            't' => 0x09,
            'v' => 0x0B,
            'c' => match self.peek() {
                Some(letter) if is_ascii_letter(letter) => {
                    self.pos += 1;
                    letter % 32
                }
                Some(next)
                    if in_class
                        && !self.unicode
                        && (is_decimal_digit(next) || next == u32::from('_')) =>
                {
                    self.pos += 1;
                    next % 32
                }
                _ if self.unicode => return Err(self.error("Invalid unicode escape")),
                _ => {
                    self.pos = start;
                    return Ok(None);
                }
            },
            '0' if !self.peek().is_some_and(is_decimal_digit) => 0,
            '0'..='7' if !self.unicode => {
                let mut value = unit - u32::from('0');
                let max_digits = if value <= 3 { 2 } else { 1 };
                for _ in 0..max_digits {
                    match self.peek().filter(|u| is_octal_digit(*u)) {
                        Some(digit) => {
                            value = value * 8 + (digit - u32::from('0'));
                            self.pos += 1;
                        }
                        None => break,
                    }
                }
                value
            }
            '0'..='9' if self.unicode => {
                return Err(self.error(if in_class {
                    "Invalid class escape"
                } else {
                    "Invalid decimal escape"
                }));
            }
            'x' => match self.fixed_hex(2) {
                Some(value) => value,
                None if self.unicode => return Err(self.error("Invalid escape")),
                None => unit,
            },
            'u' => match self.unicode_escape() {
                Some(value) => value,
                None if self.unicode => return Err(self.error("Invalid unicode escape")),
                None => unit,
            },
            _ if self.unicode => {
                if is_syntax_character(unit) || c == '/' {
                    unit
                } else {
                    return Err(self.error("Invalid escape"));
                }
            }
            _ => unit,
        };
        Ok(Some(value))
    }

    fn fixed_hex(&mut self, digits: usize) -> Option<u32> {
        let mut value = 0;
        for offset in 0..digits {
            value = value * 16 + hex_value(self.peek_at(offset)?)?;
        }
        self.pos += digits;
        Some(value)
    }

    /// The rest of `\u…` after the `u`.
    fn unicode_escape(&mut self) -> Option<u32> {
        if self.unicode && self.at('{') {
            let start = self.pos;
            self.pos += 1;
            let mut value: u32 = 0;
            let mut digits = 0;
            while let Some(digit) = self.peek().and_then(hex_value) {
                value = value.saturating_mul(16).saturating_add(digit);
                digits += 1;
                self.pos += 1;
            }
            if digits > 0 && value <= 0x10FFFF && self.eat('}') {
                return Some(value);
            }
            self.pos = start;
            return None;
        }

        let lead = self.fixed_hex(4)?;
        if self.unicode && is_lead_surrogate(lead) && self.at('\\') && self.at_offset(1, 'u') {
            let resume = self.pos;
            self.pos += 2;
            match self.fixed_hex(4) {
                Some(trail) if is_trail_surrogate(trail) => {
                    return Some((lead - 0xD800) * 0x400 + (trail - 0xDC00) + 0x10000);
                }
                _ => self.pos = resume,
            }
        }
        Some(lead)
    }

    fn class(&mut self) -> ParseResult<()> {
        self.pos += 1;
        let negated = self.eat('^');
        if self.unicode_sets {
            return self.class_set(negated);
        }
        let mut elements = Vec::new();

        loop {
            if self.pos >= self.units.len() {
                return Err(self.error("Unterminated character class"));
            }
            if self.eat(']') {
                break;
            }

            let min = self.class_atom()?;
            let forms_range = self.at('-')
                && self.peek_at(1).is_some()
                && !self.at_offset(1, ']');
            if !forms_range {
                elements.push(class_element(min));
                continue;
            }

            self.pos += 1;
            let max = self.class_atom()?;
            match (min, max) {
                (ClassAtom::Character(min), ClassAtom::Character(max)) => {
                    if min > max {
                        return Err(self.error("Range out of order in character class"));
                    }
                    elements.push(ClassElement::Range { min, max });
                }
                _ if self.unicode => return Err(self.error("Invalid character class")),
                _ => {
                    elements.push(class_element(min));
                    elements.push(ClassElement::Character(u32::from('-')));
                    elements.push(class_element(max));
                }
            }
        }

        self.classes.push(CharacterClass { negated, elements });
        Ok(())
    }

    /// Class contents under the `v` flag. Set operators, nested classes and `\q{…}`
    /// strings each end the current run of characters.
    fn class_set(&mut self, negated: bool) -> ParseResult<()> {
        let mut elements = Vec::new();

        loop {
            if self.pos >= self.units.len() {
                return Err(self.error("Unterminated character class"));
            }
            if self.eat(']') {
                break;
            }

            let doubled = self
                .peek()
                .filter(|unit| self.peek_at(1) == Some(*unit))
                .and_then(char::from_u32);
            match doubled {
                Some('&' | '-') => {
                    self.pos += 2;
                    elements.push(ClassElement::Set);
                    continue;
                }
                Some(c) if CLASS_SET_RESERVED_DOUBLES.contains(c) => {
                    return Err(self.error("Invalid set operation in character class"));
                }
                _ => {}
            }

            if self.at('[') {
                self.class()?;
                elements.push(ClassElement::Set);
                continue;
            }
            if self.at('\\') && self.at_offset(1, 'q') && self.at_offset(2, '{') {
                self.class_strings()?;
                elements.push(ClassElement::Set);
                continue;
            }

            let min = self.class_set_atom()?;
            if !self.at('-') || self.at_offset(1, '-') {
                elements.push(class_element(min));
                continue;
            }

            self.pos += 1;
            let max = self.class_set_atom()?;
            match (min, max) {
                (ClassAtom::Character(min), ClassAtom::Character(max)) if min <= max => {
                    elements.push(ClassElement::Range { min, max });
                }
                (ClassAtom::Character(_), ClassAtom::Character(_)) => {
                    return Err(self.error("Range out of order in character class"));
                }
                _ => return Err(self.error("Invalid character class")),
            }
        }

        self.classes.push(CharacterClass { negated, elements });
        Ok(())
    }

    fn class_set_atom(&mut self) -> ParseResult<ClassAtom> {
        let Some(unit) = self.peek() else {
            return Err(self.error("Unterminated character class"));
        };
        if unit == u32::from('\\') {
            let punctuator = self
                .peek_at(1)
                .and_then(char::from_u32)
                .filter(|c| CLASS_SET_RESERVED_PUNCTUATORS.contains(*c));
            if let Some(c) = punctuator {
                self.pos += 2;
                return Ok(ClassAtom::Character(u32::from(c)));
            }
            return self.class_atom();
        }
        if char::from_u32(unit).is_some_and(|c| CLASS_SET_SYNTAX_CHARACTERS.contains(c)) {
            return Err(self.error("Invalid character in character class"));
        }
        self.pos += 1;
        Ok(ClassAtom::Character(unit))
    }

    /// `\q{abc|d}`, positioned on the backslash.
    fn class_strings(&mut self) -> ParseResult<()> {
        self.pos += 3;
        loop {
            if self.eat('}') {
                return Ok(());
            }
            if self.eat('|') {
                continue;
            }
            if self.pos >= self.units.len() {
                return Err(self.error("Unterminated class string disjunction"));
            }
            self.class_set_atom()?;
        }
    }

    fn class_atom(&mut self) -> ParseResult<ClassAtom> {
        if !self.eat('\\') {
            let Some(unit) = self.next_unit() else {
                return Err(self.error("Unterminated character class"));
            };
            return Ok(ClassAtom::Character(unit));
        }

        if self.pos >= self.units.len() {
            return Err(self.error("\\ at end of pattern"));
        }
        if self.eat('b') {
            return Ok(ClassAtom::Character(0x08));
        }
        if self.unicode && self.eat('-') {
            return Ok(ClassAtom::Character(u32::from('-')));
        }
        if self.character_class_escape()? {
            return Ok(ClassAtom::Set);
        }
        match self.character_escape(true)? {
            Some(value) => Ok(ClassAtom::Character(value)),
            None => Ok(ClassAtom::Character(u32::from('\\'))),
        }
    }

    fn group(&mut self) -> ParseResult<()> {
        self.pos += 1;
        if self.eat('?') {
            if self.eat(':') {
                // non-capturing
            } else if self.ecma_version >= 2018 && self.eat('<') {
                let name = self.group_name()?;
                if self.group_names.contains(&name) {
                    return Err(self.error("Duplicate capture group name"));
                }
                self.group_names.push(name);
            } else {
                return Err(self.error("Invalid group"));
            }
        }

        self.disjunction()?;
        if !self.eat(')') {
            return Err(self.error("Unterminated group"));
        }
        Ok(())
    }

    /// Identifier up to and including the closing `>`.
    fn group_name(&mut self) -> ParseResult<String> {
        let start = self.pos;
        if !self.peek().is_some_and(is_id_start) {
            return Err(self.error("Invalid capture group name"));
        }
        self.pos += 1;
        while self.peek().is_some_and(is_id_continue) {
            self.pos += 1;
        }
        let name: String = self.units[start..self.pos]
            .iter()
            .filter_map(|u| char::from_u32(*u))
            .collect();
        if !self.eat('>') {
            return Err(self.error("Invalid capture group name"));
        }
        Ok(name)
    }
}

fn class_element(atom: ClassAtom) -> ClassElement {
    match atom {
        ClassAtom::Character(value) => ClassElement::Character(value),
        ClassAtom::Set => ClassElement::Set,
    }
}
