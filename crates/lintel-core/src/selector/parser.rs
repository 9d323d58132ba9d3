//! Recursive-descent parser for the selector grammar.

use regex::Regex;

use super::{AttrOp, AttrValueMatcher, Selector, SelectorError};

pub(super) struct SelectorParser<'s> {
    source: &'s str,
    chars: Vec<char>,
    pos: usize,
}

impl<'s> SelectorParser<'s> {
    pub(super) fn new(source: &'s str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    pub(super) fn parse(mut self) -> Result<Selector, SelectorError> {
        self.skip_ws();
        let selector = self.parse_list()?;
        self.skip_ws();
        if self.pos < self.chars.len() {
            return Err(self.error(format!("unexpected '{}'", self.chars[self.pos])));
        }
        Ok(selector)
    }

    fn error(&self, message: impl Into<String>) -> SelectorError {
        SelectorError {
            selector: self.source.to_string(),
            position: self.pos,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), SelectorError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", expected)))
        }
    }

    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn parse_list(&mut self) -> Result<Selector, SelectorError> {
        let mut selectors = vec![self.parse_complex()?];
        loop {
            self.skip_ws();
            if !self.eat(',') {
                break;
            }
            self.skip_ws();
            selectors.push(self.parse_complex()?);
        }
        Ok(if selectors.len() == 1 {
            selectors.remove(0)
        } else {
            Selector::Matches(selectors)
        })
    }

    fn parse_complex(&mut self) -> Result<Selector, SelectorError> {
        let mut left = self.parse_compound()?;
        loop {
            let save = self.pos;
            let had_ws = self.skip_ws();
            let combinator = match self.peek() {
                Some('>') => {
                    self.pos += 1;
                    Some('>')
                }
                Some('+') => {
                    self.pos += 1;
                    Some('+')
                }
                Some('~') => {
                    self.pos += 1;
                    Some('~')
                }
                Some(',') | Some(')') | None => None,
                Some(_) if had_ws => Some(' '),
                Some(_) => None,
            };
            let Some(combinator) = combinator else {
                self.pos = save;
                break;
            };
            self.skip_ws();
            let right = Box::new(self.parse_compound()?);
            let previous = Box::new(left);
            left = match combinator {
                '>' => Selector::Child(previous, right),
                '+' => Selector::Adjacent(previous, right),
                '~' => Selector::Sibling(previous, right),
                _ => Selector::Descendant(previous, right),
            };
        }
        Ok(left)
    }

    fn parse_compound(&mut self) -> Result<Selector, SelectorError> {
        let mut parts = Vec::new();
        loop {
            match self.peek() {
                Some('*') => {
                    self.pos += 1;
                    parts.push(Selector::Wildcard);
                }
                Some('[') => parts.push(self.parse_attribute()?),
                Some(':') => parts.push(self.parse_pseudo()?),
                Some(c) if is_ident_start(c) => {
                    let name = self.parse_ident();
                    parts.push(Selector::Type(name));
                }
                _ => break,
            }
        }
        match parts.len() {
            0 => Err(self.error("expected a selector")),
            1 => Ok(parts.remove(0)),
            _ => Ok(Selector::Compound(parts)),
        }
    }

    fn parse_ident(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn parse_attribute(&mut self) -> Result<Selector, SelectorError> {
        self.expect('[')?;
        self.skip_ws();

        let mut path = Vec::new();
        loop {
            if !self.peek().is_some_and(is_ident_start) {
                return Err(self.error("expected an attribute name"));
            }
            path.push(self.parse_ident());
            if !self.eat('.') {
                break;
            }
        }
        self.skip_ws();

        if self.eat(']') {
            return Ok(Selector::Attribute { path, test: None });
        }

        let op = if self.eat('=') {
            AttrOp::Eq
        } else if self.eat('!') {
            self.expect('=')?;
            AttrOp::NotEq
        } else if self.eat('<') {
            if self.eat('=') { AttrOp::Lte } else { AttrOp::Lt }
        } else if self.eat('>') {
            if self.eat('=') { AttrOp::Gte } else { AttrOp::Gt }
        } else {
            return Err(self.error("expected an attribute operator"));
        };
        self.skip_ws();

        let value = self.parse_attr_value(op)?;
        self.skip_ws();
        self.expect(']')?;

        Ok(Selector::Attribute {
            path,
            test: Some((op, value)),
        })
    }

    fn parse_attr_value(&mut self, op: AttrOp) -> Result<AttrValueMatcher, SelectorError> {
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let mut text = String::new();
                loop {
                    match self.peek() {
                        None => return Err(self.error("unterminated string")),
                        Some('\\') => {
                            self.pos += 1;
                            if let Some(c) = self.peek() {
                                text.push(c);
                                self.pos += 1;
                            }
                        }
                        Some(c) if c == quote => {
                            self.pos += 1;
                            break;
                        }
                        Some(c) => {
                            text.push(c);
                            self.pos += 1;
                        }
                    }
                }
                AttrValueMatcher::String(text)
            }
            Some('/') => {
                self.pos += 1;
                let mut pattern = String::new();
                let mut in_class = false;
                loop {
                    match self.peek() {
                        None => return Err(self.error("unterminated regular expression")),
                        Some('\\') => {
                            pattern.push('\\');
                            self.pos += 1;
                            if let Some(c) = self.peek() {
                                pattern.push(c);
                                self.pos += 1;
                            }
                        }
                        Some('/') if !in_class => {
                            self.pos += 1;
                            break;
                        }
                        Some(c) => {
                            if c == '[' {
                                in_class = true;
                            } else if c == ']' {
                                in_class = false;
                            }
                            pattern.push(c);
                            self.pos += 1;
                        }
                    }
                }
                let mut flags = String::new();
                while let Some(c @ ('i' | 'm' | 's' | 'u')) = self.peek() {
                    flags.push(c);
                    self.pos += 1;
                }
                let inline = flags.chars().filter(|c| *c != 'u').collect::<String>();
                let source = if inline.is_empty() {
                    pattern
                } else {
                    format!("(?{}){}", inline, pattern)
                };
                let regex = Regex::new(&source)
                    .map_err(|e| self.error(format!("invalid regular expression: {}", e)))?;
                AttrValueMatcher::Regex(regex)
            }
            Some(c) if c.is_ascii_digit() || c == '-' || c == '.' => {
                let start = self.pos;
                self.pos += 1;
                while self
                    .peek()
                    .is_some_and(|c| c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E')
                {
                    self.pos += 1;
                }
                let text: String = self.chars[start..self.pos].iter().collect();
                let number = text
                    .parse::<f64>()
                    .map_err(|_| self.error(format!("invalid number '{}'", text)))?;
                AttrValueMatcher::Number(number)
            }
            Some(c) if is_ident_start(c) => AttrValueMatcher::String(self.parse_ident()),
            _ => return Err(self.error("expected an attribute value")),
        };

        let ordered = matches!(op, AttrOp::Lt | AttrOp::Lte | AttrOp::Gt | AttrOp::Gte);
        if ordered && !matches!(value, AttrValueMatcher::Number(_)) {
            return Err(self.error("relational operators need a numeric value"));
        }
        if !matches!(op, AttrOp::Eq | AttrOp::NotEq) && matches!(value, AttrValueMatcher::Regex(_)) {
            return Err(self.error("regular expressions only support '=' and '!='"));
        }
        Ok(value)
    }

    fn parse_pseudo(&mut self) -> Result<Selector, SelectorError> {
        self.expect(':')?;
        let name = self.parse_ident();
        match name.as_str() {
            "first-child" => Ok(Selector::NthChild(1)),
            "last-child" => Ok(Selector::NthLastChild(1)),
            "nth-child" | "nth-last-child" => {
                self.expect('(')?;
                self.skip_ws();
                let start = self.pos;
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.pos += 1;
                }
                let digits: String = self.chars[start..self.pos].iter().collect();
                let index = digits
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| self.error("expected a positive integer"))?;
                self.skip_ws();
                self.expect(')')?;
                Ok(if name == "nth-child" {
                    Selector::NthChild(index)
                } else {
                    Selector::NthLastChild(index)
                })
            }
            "not" | "matches" | "is" | "has" => {
                self.expect('(')?;
                self.skip_ws();
                let mut selectors = vec![self.parse_complex()?];
                loop {
                    self.skip_ws();
                    if !self.eat(',') {
                        break;
                    }
                    self.skip_ws();
                    selectors.push(self.parse_complex()?);
                }
                self.expect(')')?;
                Ok(match name.as_str() {
                    "not" => Selector::Not(selectors),
                    "has" => Selector::Has(selectors),
                    _ => Selector::Matches(selectors),
                })
            }
            "" => Err(self.error("expected a pseudo-class name")),
            other => Err(self.error(format!("unknown pseudo-class ':{}'", other))),
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$' || c == '-'
}
