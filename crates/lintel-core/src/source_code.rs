//! Source text with a line index and the comments and tokens found by the parser.

use serde::Serialize;

use crate::ast::{Node, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CommentKind {
    Line,
    Block,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comment {
    pub kind: CommentKind,
    /// Text between the delimiters.
    pub value: String,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TokenKind {
    Boolean,
    Identifier,
    Keyword,
    Null,
    Numeric,
    Punctuator,
    RegularExpression,
    String,
    Template,
    JSXIdentifier,
    JSXText,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    /// Source text of the token.
    pub value: String,
    pub span: Span,
}

impl Token {
    pub fn is_punctuator(&self, value: &str) -> bool {
        self.kind == TokenKind::Punctuator && self.value == value
    }
}

/// A 1-based line and a 0-based column counted in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone)]
pub struct SourceCode {
    text: String,
    line_starts: Vec<usize>,
    comments: Vec<Comment>,
    tokens: Vec<Token>,
}

impl SourceCode {
    pub fn new(text: &str, comments: Vec<Comment>) -> Self {
        Self {
            text: text.to_string(),
            line_starts: line_starts(text),
            comments,
            tokens: Vec::new(),
        }
    }

    /// Attaches the token stream, sorted by position.
    pub fn with_tokens(mut self, tokens: Vec<Token>) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    /// Tokens in source order, comments excluded.
    ///
    /// Template continuations after a substitution and JSX children are rescanned by
    /// the parser; they keep their first reading (`}` for a template continuation).
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Tokens lying entirely inside `span`.
    pub fn tokens_in(&self, span: Span) -> &[Token] {
        let start = self.tokens.partition_point(|token| token.span.start < span.start);
        let end = self.tokens.partition_point(|token| token.span.end <= span.end);
        self.tokens.get(start..end.max(start)).unwrap_or(&[])
    }

    /// Last token ending at or before `offset`.
    pub fn token_before(&self, offset: usize) -> Option<&Token> {
        let index = self.tokens.partition_point(|token| token.span.end <= offset);
        index.checked_sub(1).map(|index| &self.tokens[index])
    }

    /// First token starting at or after `offset`.
    pub fn token_after(&self, offset: usize) -> Option<&Token> {
        let index = self.tokens.partition_point(|token| token.span.start < offset);
        self.tokens.get(index)
    }

    pub fn first_token(&self, node: Node<'_>) -> Option<&Token> {
        self.tokens_in(node.span()).first()
    }

    pub fn last_token(&self, node: Node<'_>) -> Option<&Token> {
        self.tokens_in(node.span()).last()
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Text of `line` (1-based) without its terminator.
    pub fn line(&self, line: usize) -> Option<&str> {
        let index = line.checked_sub(1)?;
        let start = *self.line_starts.get(index)?;
        let end = self
            .line_starts
            .get(index + 1)
            .copied()
            .unwrap_or(self.text.len());
        Some(self.text[start..end].trim_end_matches(['\n', '\r', '\u{2028}', '\u{2029}']))
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        (1..=self.line_count()).filter_map(|line| self.line(line))
    }

    pub fn location(&self, offset: usize) -> Location {
        let offset = offset.min(self.text.len());
        let index = match self.line_starts.binary_search(&offset) {
            Ok(index) => index,
            Err(index) => index - 1,
        };
        let start = self.line_starts[index];
        let column = self
            .text
            .get(start..offset)
            .map_or(offset - start, |prefix| prefix.chars().count());
        Location {
            line: index + 1,
            column,
        }
    }

    /// Byte offset of a location, if it lies inside the text.
    pub fn offset(&self, location: Location) -> Option<usize> {
        let start = *self.line_starts.get(location.line.checked_sub(1)?)?;
        let line = self.line(location.line)?;
        if location.column == line.chars().count() {
            return Some(start + line.len());
        }
        line.char_indices()
            .nth(location.column)
            .map(|(index, _)| start + index)
    }

    pub fn slice(&self, span: Span) -> &str {
        self.text.get(span.start..span.end).unwrap_or("")
    }

    pub fn node_text(&self, node: Node<'_>) -> &str {
        self.slice(node.span())
    }
}

fn line_starts(text: &str) -> Vec<usize> {
    let mut starts = vec![0];
    let mut chars = text.char_indices().peekable();
    while let Some((index, c)) = chars.next() {
        match c {
            '\r' => {
                if let Some((_, '\n')) = chars.peek() {
                    chars.next();
                    starts.push(index + 2);
                } else {
                    starts.push(index + 1);
                }
            }
            '\n' | '\u{2028}' | '\u{2029}' => starts.push(index + c.len_utf8()),
            _ => {}
        }
    }
    starts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locations_are_line_and_char_column() {
        let source = SourceCode::new("let a;\nlet 😀 = b;", Vec::new());

        assert_eq!(source.location(0), Location { line: 1, column: 0 });
        assert_eq!(source.location(7), Location { line: 2, column: 0 });

        let b = source.text().find('b').unwrap();
        assert_eq!(source.location(b), Location { line: 2, column: 8 });
    }

    #[test]
    fn offset_inverts_location() {
        let source = SourceCode::new("a\r\nbc\rd", Vec::new());

        assert_eq!(source.line_count(), 3);
        assert_eq!(source.line(2), Some("bc"));
        assert_eq!(source.offset(Location { line: 2, column: 1 }), Some(4));
        assert_eq!(source.offset(Location { line: 3, column: 1 }), Some(7));
        assert_eq!(source.offset(Location { line: 9, column: 0 }), None);
    }

    #[test]
    fn token_lookups_by_offset_and_span() {
        let token = |kind, value: &str, start| Token {
            kind,
            value: value.to_string(),
            span: Span::new(start, start + value.len()),
        };
        let source = SourceCode::new("f(a, b)", Vec::new()).with_tokens(vec![
            token(TokenKind::Identifier, "f", 0),
            token(TokenKind::Punctuator, "(", 1),
            token(TokenKind::Identifier, "a", 2),
            token(TokenKind::Punctuator, ",", 3),
            token(TokenKind::Identifier, "b", 5),
            token(TokenKind::Punctuator, ")", 6),
        ]);

        let inner: Vec<_> = source
            .tokens_in(Span::new(2, 6))
            .iter()
            .map(|token| token.value.as_str())
            .collect();
        assert_eq!(inner, vec!["a", ",", "b"]);
        assert!(source.tokens_in(Span::new(4, 5)).is_empty());

        assert_eq!(source.token_before(4).map(|t| t.value.as_str()), Some(","));
        assert_eq!(source.token_before(3).map(|t| t.value.as_str()), Some("a"));
        assert_eq!(source.token_after(4).map(|t| t.value.as_str()), Some("b"));
        assert!(source.token_before(0).is_none());
        assert!(source.token_after(7).is_none());
        assert!(source.tokens()[3].is_punctuator(","));
    }

    #[test]
    fn empty_source_has_one_line() {
        let source = SourceCode::new("", Vec::new());

        assert_eq!(source.line_count(), 1);
        assert_eq!(source.line(1), Some(""));
        assert_eq!(source.location(0), Location { line: 1, column: 0 });
    }
}
