//! Problems, edits and suggestions reported by rules.

use serde::Serialize;

use crate::ast::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// A single text replacement over the half-open byte range `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Edit {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl Edit {
    pub fn new(start: usize, end: usize, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self::new(at, at, text)
    }

    pub fn delete(start: usize, end: usize) -> Self {
        Self::new(start, end, String::new())
    }

    pub fn replace(span: Span, text: impl Into<String>) -> Self {
        Self::new(span.start, span.end, text)
    }

    pub fn span(&self) -> Span {
        Span::new(self.start, self.end)
    }

    /// Checks the range against `source`: ordered, in bounds and on char boundaries.
    pub fn is_valid_for(&self, source: &str) -> bool {
        self.start <= self.end
            && self.end <= source.len()
            && source.is_char_boundary(self.start)
            && source.is_char_boundary(self.end)
    }

    /// Touching ranges do not overlap.
    pub fn overlaps(&self, other: &Edit) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Applies this edit alone to `source`.
    pub fn apply(&self, source: &str) -> String {
        let mut output = String::with_capacity(source.len() + self.text.len());
        output.push_str(&source[..self.start]);
        output.push_str(&self.text);
        output.push_str(&source[self.end..]);
        output
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    pub desc: String,
    pub fix: Edit,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    pub rule_id: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    pub severity: Severity,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub fatal: bool,
    pub line: usize,
    pub column: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_column: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix: Option<Edit>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<Suggestion>,
}

impl Problem {
    pub fn new(rule_id: Option<&str>, severity: Severity, message: &str, line: usize, column: usize) -> Self {
        Self {
            rule_id: rule_id.map(str::to_string),
            message: message.to_string(),
            message_id: None,
            severity,
            fatal: false,
            line,
            column,
            end_line: None,
            end_column: None,
            node_type: None,
            fix: None,
            suggestions: Vec::new(),
        }
    }

    /// The single problem produced for a file that failed to parse.
    pub fn parse_failure(message: &str, line: usize, column: usize) -> Self {
        let mut problem = Self::new(
            None,
            Severity::Error,
            &format!("Parsing error: {}", message),
            line,
            column,
        );
        problem.fatal = true;
        problem
    }

    pub fn with_end(mut self, end_line: usize, end_column: usize) -> Self {
        self.end_line = Some(end_line);
        self.end_column = Some(end_column);
        self
    }

    pub fn with_fix(mut self, fix: Edit) -> Self {
        self.fix = Some(fix);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_validity_checks_bounds_and_order() {
        let source = "let a = 1;";

        assert!(Edit::new(0, 3, "var").is_valid_for(source));
        assert!(Edit::insert(source.len(), ";").is_valid_for(source));
        assert!(!Edit::new(4, 2, "").is_valid_for(source));
        assert!(!Edit::new(0, 42, "").is_valid_for(source));
    }

    #[test]
    fn edit_rejects_split_characters() {
        let source = "/[😍]/";
        assert!(!Edit::new(3, 3, "x").is_valid_for(source));
    }

    #[test]
    fn touching_edits_do_not_overlap() {
        let a = Edit::new(0, 3, "x");
        let b = Edit::new(3, 5, "y");
        let c = Edit::new(2, 4, "z");

        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(b.overlaps(&c));
    }

    #[test]
    fn apply_single_edit() {
        let edit = Edit::insert(6, "u");
        assert_eq!(edit.apply("/[a]/ ;"), "/[a]/ u;");
    }

    #[test]
    fn parse_failure_is_fatal_error() {
        let problem = Problem::parse_failure("Unexpected token", 1, 7);

        assert!(problem.fatal);
        assert_eq!(problem.severity, Severity::Error);
        assert!(problem.rule_id.is_none());
        assert_eq!(problem.message, "Parsing error: Unexpected token");
    }
}
