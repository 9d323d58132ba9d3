//! What a rule sees while it runs, and how it reports.

use std::cell::{Cell, RefCell};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::{Map, Value};
use tracing::warn;

use super::RuleMeta;
use crate::ast::{Ast, Node, NodeId, Span};
use crate::config::LanguageOptions;
use crate::diagnostic::{Edit, Problem, Severity, Suggestion};
use crate::fix::merge_edits;
use crate::parser::ParsedFile;
use crate::semantic::{Scope, ScopeManager};
use crate::source_code::{Location, SourceCode};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([^{}]+?)\s*\}\}").expect("Invalid regex pattern")
});

/// Per-file state shared by every rule of one pass.
pub(crate) struct FileContext<'a> {
    pub file: &'a ParsedFile,
    pub scopes: &'a ScopeManager,
    pub language_options: &'a LanguageOptions,
    pub settings: &'a Map<String, Value>,
    pub filename: &'a str,
    pub problems: RefCell<Vec<Problem>>,
}

pub struct RuleContext<'a> {
    file: &'a FileContext<'a>,
    rule_id: &'a str,
    meta: &'a RuleMeta,
    severity: Severity,
    options: &'a [Value],
    current: Cell<Option<NodeId>>,
    fault: RefCell<Option<String>>,
}

impl<'a> RuleContext<'a> {
    pub(crate) fn new(
        file: &'a FileContext<'a>,
        rule_id: &'a str,
        meta: &'a RuleMeta,
        severity: Severity,
        options: &'a [Value],
    ) -> Self {
        Self {
            file,
            rule_id,
            meta,
            severity,
            options,
            current: Cell::new(None),
            fault: RefCell::new(None),
        }
    }

    pub fn id(&self) -> &'a str {
        self.rule_id
    }

    pub fn meta(&self) -> &'a RuleMeta {
        self.meta
    }

    pub fn options(&self) -> &'a [Value] {
        self.options
    }

    pub fn option(&self, index: usize) -> Option<&'a Value> {
        self.options.get(index)
    }

    pub fn settings(&self) -> &'a Map<String, Value> {
        self.file.settings
    }

    pub fn language_options(&self) -> &'a LanguageOptions {
        self.file.language_options
    }

    pub fn filename(&self) -> &'a str {
        self.file.filename
    }

    pub fn source_code(&self) -> &'a SourceCode {
        self.file.file.source_code()
    }

    pub fn source_text(&self) -> &'a str {
        self.file.file.source()
    }

    pub fn ast(&self) -> &'a Ast {
        self.file.file.ast()
    }

    pub fn scope_manager(&self) -> &'a ScopeManager {
        self.file.scopes
    }

    /// Innermost scope of the node being visited; the global scope for `Program`.
    pub fn scope(&self) -> &'a Scope {
        let node = self.current_node().unwrap_or_else(|| self.ast().root());
        self.scope_of(node)
    }

    pub fn scope_of(&self, node: Node<'a>) -> &'a Scope {
        let scopes = self.file.scopes;
        scopes.scope(scopes.scope_for(node))
    }

    pub fn current_node(&self) -> Option<Node<'a>> {
        self.current.get().map(|id| self.ast().node(id))
    }

    pub(crate) fn set_current(&self, node: Node<'a>) {
        self.current.set(Some(node.id()));
    }

    pub(crate) fn take_fault(&self) -> Option<String> {
        self.fault.borrow_mut().take()
    }

    fn fail(&self, message: String) {
        let mut fault = self.fault.borrow_mut();
        if fault.is_none() {
            *fault = Some(message);
        }
    }

    pub fn report(&self, report: Report<'a>) {
        let Some((message, message_id)) = self.resolve_message(
            report.message.as_deref(),
            report.message_id.as_deref(),
            &report.data,
        ) else {
            return;
        };

        let source_code = self.source_code();
        let (start, end, node_type) = match report.target {
            ReportTarget::Node(node) => (
                source_code.location(node.start()),
                Some(source_code.location(node.end())),
                Some(node.kind().to_string()),
            ),
            ReportTarget::Span(span) => (
                source_code.location(span.start),
                Some(source_code.location(span.end)),
                None,
            ),
            ReportTarget::Loc { start, end } => (start, end, None),
        };

        let mut problem = Problem::new(
            Some(self.rule_id),
            self.severity,
            &message,
            start.line,
            start.column + 1,
        );
        problem.message_id = message_id;
        problem.node_type = node_type;
        if let Some(end) = end {
            problem = problem.with_end(end.line, end.column + 1);
        }

        if let Some(fix) = report.fix {
            let fixer = Fixer::new();
            if let Some(edit) = self.finish_edits(fix(&fixer)) {
                if self.meta.fixable.is_none() {
                    self.fail(
                        "rule produced a fix but its metadata does not declare `fixable`"
                            .to_string(),
                    );
                    return;
                }
                problem.fix = Some(edit);
            }
        }

        if !report.suggestions.is_empty() && !self.meta.has_suggestions {
            self.fail(
                "rule reported suggestions but its metadata does not declare `has_suggestions`"
                    .to_string(),
            );
            return;
        }
        for suggest in report.suggestions {
            let Some((desc, message_id)) = self.resolve_message(
                suggest.desc.as_deref(),
                suggest.message_id.as_deref(),
                &suggest.data,
            ) else {
                return;
            };
            let fixer = Fixer::new();
            if let Some(fix) = self.finish_edits((suggest.fix)(&fixer)) {
                problem.suggestions.push(Suggestion {
                    message_id,
                    desc,
                    fix,
                });
            }
        }

        self.file.problems.borrow_mut().push(problem);
    }

    fn resolve_message(
        &self,
        message: Option<&str>,
        message_id: Option<&str>,
        data: &[(String, String)],
    ) -> Option<(String, Option<String>)> {
        match (message_id, message) {
            (Some(id), _) => match self.meta.message(id) {
                Some(template) => Some((interpolate(template, data), Some(id.to_string()))),
                None => {
                    self.fail(format!(
                        "report used message id '{}' which is not declared in the rule's messages",
                        id
                    ));
                    None
                }
            },
            (None, Some(message)) => Some((interpolate(message, data), None)),
            (None, None) => {
                self.fail(
                    "report has neither a message nor a message id"
                        .to_string(),
                );
                None
            }
        }
    }

    /// Merges the edits of one fix and checks them against the source.
    fn finish_edits(&self, edits: Vec<Edit>) -> Option<Edit> {
        if edits.is_empty() {
            return None;
        }
        let source = self.source_text();
        if let Some(bad) = edits.iter().find(|edit| !edit.is_valid_for(source)) {
            warn!(
                rule = self.rule_id,
                start = bad.start,
                end = bad.end,
                "discarding fix with an invalid range"
            );
            return None;
        }
        let merged = merge_edits(source, edits);
        if merged.is_none() {
            warn!(rule = self.rule_id, "discarding fix with overlapping edits");
        }
        merged
    }
}

/// Replaces `{{ key }}` placeholders with values from `data`. Unknown keys stay as written.
pub fn interpolate(template: &str, data: &[(String, String)]) -> String {
    if data.is_empty() {
        return template.to_string();
    }
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            let key = caps.get(1).map_or("", |m| m.as_str());
            data.iter()
                .find(|(k, _)| k == key)
                .map(|(_, value)| value.clone())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

type FixFn<'a> = Box<dyn FnOnce(&Fixer) -> Vec<Edit> + 'a>;

enum ReportTarget<'a> {
    Node(Node<'a>),
    Span(Span),
    Loc {
        start: Location,
        end: Option<Location>,
    },
}

/// A problem description handed to [`RuleContext::report`].
pub struct Report<'a> {
    target: ReportTarget<'a>,
    message: Option<String>,
    message_id: Option<String>,
    data: Vec<(String, String)>,
    fix: Option<FixFn<'a>>,
    suggestions: Vec<Suggest<'a>>,
}

impl<'a> Report<'a> {
    pub fn node(node: Node<'a>) -> Self {
        Self::with_target(ReportTarget::Node(node))
    }

    pub fn span(span: Span) -> Self {
        Self::with_target(ReportTarget::Span(span))
    }

    /// Explicit location; columns are 0-based here.
    pub fn loc(start: Location, end: Option<Location>) -> Self {
        Self::with_target(ReportTarget::Loc { start, end })
    }

    fn with_target(target: ReportTarget<'a>) -> Self {
        Self {
            target,
            message: None,
            message_id: None,
            data: Vec::new(),
            fix: None,
            suggestions: Vec::new(),
        }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    pub fn data(mut self, key: &str, value: impl ToString) -> Self {
        self.data.push((key.to_string(), value.to_string()));
        self
    }

    pub fn fix<F, R>(mut self, fix: F) -> Self
    where
        F: FnOnce(&Fixer) -> R + 'a,
        R: IntoEdits,
    {
        self.fix = Some(Box::new(move |fixer| fix(fixer).into_edits()));
        self
    }

    pub fn suggest(mut self, suggestion: Suggest<'a>) -> Self {
        self.suggestions.push(suggestion);
        self
    }
}

/// One suggestion of a [`Report`].
pub struct Suggest<'a> {
    message_id: Option<String>,
    desc: Option<String>,
    data: Vec<(String, String)>,
    fix: FixFn<'a>,
}

impl<'a> Suggest<'a> {
    pub fn message_id<F, R>(message_id: &str, fix: F) -> Self
    where
        F: FnOnce(&Fixer) -> R + 'a,
        R: IntoEdits,
    {
        Self {
            message_id: Some(message_id.to_string()),
            desc: None,
            data: Vec::new(),
            fix: Box::new(move |fixer| fix(fixer).into_edits()),
        }
    }

    pub fn desc<F, R>(desc: &str, fix: F) -> Self
    where
        F: FnOnce(&Fixer) -> R + 'a,
        R: IntoEdits,
    {
        Self {
            message_id: None,
            desc: Some(desc.to_string()),
            data: Vec::new(),
            fix: Box::new(move |fixer| fix(fixer).into_edits()),
        }
    }

    pub fn data(mut self, key: &str, value: impl ToString) -> Self {
        self.data.push((key.to_string(), value.to_string()));
        self
    }
}

/// What a fix function may return.
pub trait IntoEdits {
    fn into_edits(self) -> Vec<Edit>;
}

impl IntoEdits for Edit {
    fn into_edits(self) -> Vec<Edit> {
        vec![self]
    }
}

impl IntoEdits for Option<Edit> {
    fn into_edits(self) -> Vec<Edit> {
        self.into_iter().collect()
    }
}

impl IntoEdits for Vec<Edit> {
    fn into_edits(self) -> Vec<Edit> {
        self
    }
}

/// Builds edits for fix functions.
pub struct Fixer {
    _private: (),
}

impl Fixer {
    fn new() -> Self {
        Self { _private: () }
    }

    pub fn insert_text_before(&self, node: Node<'_>, text: &str) -> Edit {
        self.insert_text_before_range(node.span(), text)
    }

    pub fn insert_text_after(&self, node: Node<'_>, text: &str) -> Edit {
        self.insert_text_after_range(node.span(), text)
    }

    pub fn insert_text_before_range(&self, span: Span, text: &str) -> Edit {
        Edit::insert(span.start, text)
    }

    pub fn insert_text_after_range(&self, span: Span, text: &str) -> Edit {
        Edit::insert(span.end, text)
    }

    pub fn replace_text(&self, node: Node<'_>, text: &str) -> Edit {
        self.replace_text_range(node.span(), text)
    }

    pub fn replace_text_range(&self, span: Span, text: &str) -> Edit {
        Edit::replace(span, text)
    }

    pub fn remove(&self, node: Node<'_>) -> Edit {
        self.remove_range(node.span())
    }

    pub fn remove_range(&self, span: Span) -> Edit {
        Edit::delete(span.start, span.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn interpolate_replaces_known_placeholders() {
        let result = interpolate(
            "Expected '{{expectedOperator}}' and instead saw '{{ actualOperator }}'.",
            &data(&[("expectedOperator", "==="), ("actualOperator", "==")]),
        );

        assert_eq!(result, "Expected '===' and instead saw '=='.");
    }

    #[test]
    fn interpolate_keeps_unknown_placeholders() {
        let result = interpolate("'{{name}}' and {{other}}", &data(&[("name", "x")]));

        assert_eq!(result, "'x' and {{other}}");
    }

    #[test]
    fn fixer_builds_edits_from_ranges() {
        let fixer = Fixer::new();
        let span = Span::new(4, 7);

        assert_eq!(fixer.insert_text_before_range(span, "("), Edit::insert(4, "("));
        assert_eq!(fixer.insert_text_after_range(span, ")"), Edit::insert(7, ")"));
        assert_eq!(fixer.replace_text_range(span, "==="), Edit::new(4, 7, "==="));
        assert_eq!(fixer.remove_range(span), Edit::delete(4, 7));
    }

    #[test]
    fn into_edits_accepts_all_fix_shapes() {
        assert_eq!(Edit::insert(0, "a").into_edits().len(), 1);
        assert!(None::<Edit>.into_edits().is_empty());
        assert_eq!(vec![Edit::insert(0, "a"), Edit::insert(1, "b")].into_edits().len(), 2);
    }
}
