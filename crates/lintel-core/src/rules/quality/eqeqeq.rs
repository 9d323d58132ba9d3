//! eqeqeq: require `===` and `!==` instead of `==` and `!=`.
//!
//! `"always"` (the default) flags every loose comparison; its second option controls
//! comparisons against `null`. `"smart"` allows `typeof` checks, comparisons between
//! literals of one type, and `null` checks.

use serde_json::{Value, json};

use crate::ast::Node;
use crate::declare_rule;
use crate::rules::helpers::find_token;
use crate::rules::{Listeners, Report, Rule, RuleContext, RuleMeta};

declare_rule!(
    Eqeqeq,
    name = "eqeqeq",
    rule_type = Suggestion,
    description = "Require the use of `===` and `!==`",
    messages = [(
        "unexpected",
        "Expected '{{expectedOperator}}' and instead saw '{{actualOperator}}'."
    )],
    fixable = Code,
    schema = json!({
        "anyOf": [
            {
                "type": "array",
                "items": [
                    { "enum": ["always"] },
                    {
                        "type": "object",
                        "properties": { "null": { "enum": ["always", "never", "ignore"] } },
                        "additionalProperties": false
                    }
                ],
                "additionalItems": false
            },
            {
                "type": "array",
                "items": [{ "enum": ["smart", "allow-null"] }],
                "additionalItems": false
            }
        ]
    }),
    docs_url = "https://eslint.org/docs/latest/rules/eqeqeq",
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Always,
    Smart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NullMode {
    Always,
    Never,
    Ignore,
}

fn parse_options(options: &[Value]) -> (Mode, NullMode) {
    let null_option = options
        .get(1)
        .and_then(|config| config.get("null"))
        .and_then(Value::as_str);
    match options.first().and_then(Value::as_str) {
        Some("smart") => (Mode::Smart, NullMode::Ignore),
        // Deprecated spelling of `["always", { "null": "ignore" }]`.
        Some("allow-null") => (Mode::Always, NullMode::Ignore),
        _ => {
            let null = match null_option {
                Some("never") => NullMode::Never,
                Some("ignore") => NullMode::Ignore,
                _ => NullMode::Always,
            };
            (Mode::Always, null)
        }
    }
}

fn is_typeof(node: Node<'_>) -> bool {
    let node = node.skip_parens();
    node.is("UnaryExpression") && node.str_attr("operator") == Some("typeof")
}

fn is_null_literal(node: Node<'_>) -> bool {
    let node = node.skip_parens();
    node.is("Literal") && node.str_attr("raw") == Some("null")
}

/// `typeof` of a literal's runtime value.
fn literal_type(node: Node<'_>) -> Option<&'static str> {
    let node = node.skip_parens();
    if !node.is("Literal") {
        return None;
    }
    if node.attr("bigint").is_some() {
        return Some("bigint");
    }
    if node.has_attr_prefix("regex") {
        return Some("object");
    }
    let kind = match node.attr("value")? {
        crate::ast::AttrValue::Str(_) => "string",
        crate::ast::AttrValue::Num(_) => "number",
        crate::ast::AttrValue::Bool(_) => "boolean",
        crate::ast::AttrValue::Null => "object",
    };
    Some(kind)
}

struct Comparison<'a> {
    left: Node<'a>,
    right: Node<'a>,
}

impl<'a> Comparison<'a> {
    fn of(node: Node<'a>) -> Option<Self> {
        Some(Self {
            left: node.child("left")?,
            right: node.child("right")?,
        })
    }

    fn is_typeof(&self) -> bool {
        is_typeof(self.left) || is_typeof(self.right)
    }

    fn is_null_check(&self) -> bool {
        is_null_literal(self.left) || is_null_literal(self.right)
    }

    fn are_literals_of_same_type(&self) -> bool {
        match (literal_type(self.left), literal_type(self.right)) {
            (Some(left), Some(right)) => left == right,
            _ => false,
        }
    }
}

impl Rule for Eqeqeq {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn create<'a>(&'a self, ctx: &RuleContext<'a>) -> Listeners<'a> {
        let (mode, null) = parse_options(ctx.options());

        Listeners::new().on("BinaryExpression", move |node, ctx| {
            let Some(operator) = node.str_attr("operator") else {
                return;
            };
            let Some(comparison) = Comparison::of(node) else {
                return;
            };

            let expected = match operator {
                "==" | "!=" => {
                    let skip = match mode {
                        Mode::Smart => {
                            comparison.is_typeof()
                                || comparison.are_literals_of_same_type()
                                || comparison.is_null_check()
                        }
                        Mode::Always => null != NullMode::Always && comparison.is_null_check(),
                    };
                    if skip {
                        return;
                    }
                    format!("{}=", operator)
                }
                "===" | "!==" if mode == Mode::Always && null == NullMode::Never => {
                    if !comparison.is_null_check() {
                        return;
                    }
                    operator[..2].to_string()
                }
                _ => return,
            };

            report(ctx, &comparison, operator, &expected);
        })
    }
}

fn report<'a>(ctx: &RuleContext<'a>, comparison: &Comparison<'a>, actual: &str, expected: &str) {
    let between = crate::ast::Span::new(comparison.left.end(), comparison.right.start());
    let Some(operator_span) = find_token(ctx.source_code(), between, actual) else {
        return;
    };
    let fixable = comparison.is_typeof() || comparison.are_literals_of_same_type();
    let replacement = expected.to_string();

    let mut report = Report::span(operator_span)
        .message_id("unexpected")
        .data("expectedOperator", expected)
        .data("actualOperator", actual);
    if fixable {
        report = report.fix(move |fixer| fixer.replace_text_range(operator_span, &replacement));
    }
    ctx.report(report);
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::config::{LintConfig, RuleEntry};
    use crate::diagnostic::Problem;
    use crate::linter::Linter;

    fn run_eqeqeq(code: &str, options: Vec<serde_json::Value>) -> Vec<Problem> {
        let config = LintConfig::new().with_rule("eqeqeq", RuleEntry::error().with_options(options));
        Linter::new().verify(code, &config, "test.js").unwrap()
    }

    #[test]
    fn detects_loose_equality() {
        let problems = run_eqeqeq("if (x == y) {}", vec![]);

        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].message, "Expected '===' and instead saw '=='.");
        assert_eq!(problems[0].message_id.as_deref(), Some("unexpected"));
        assert_eq!((problems[0].line, problems[0].column), (1, 7));
        assert_eq!(problems[0].end_column, Some(9));
        assert!(problems[0].fix.is_none());
    }

    #[test]
    fn detects_loose_inequality() {
        let problems = run_eqeqeq("a != b", vec![]);

        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].message, "Expected '!==' and instead saw '!='.");
    }

    #[test]
    fn ignores_strict_operators() {
        assert!(run_eqeqeq("if (x === y && x !== z) {}", vec![]).is_empty());
    }

    #[test]
    fn always_flags_null_comparisons_by_default() {
        assert_eq!(run_eqeqeq("x == null", vec![]).len(), 1);
        assert!(run_eqeqeq("x == null", vec![json!("always"), json!({"null": "ignore"})]).is_empty());
    }

    #[test]
    fn null_never_requires_loose_null_checks() {
        let problems = run_eqeqeq("x === null", vec![json!("always"), json!({"null": "never"})]);

        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].message, "Expected '==' and instead saw '==='.");
    }

    #[test]
    fn smart_allows_safe_comparisons() {
        let code = "typeof foo == 'undefined'; 'a' == 'b'; x != null; 1 == 2;";

        assert!(run_eqeqeq(code, vec![json!("smart")]).is_empty());
        assert_eq!(run_eqeqeq("a == b", vec![json!("smart")]).len(), 1);
    }

    #[test]
    fn fixes_typeof_and_same_type_literals_only() {
        let problems = run_eqeqeq("typeof a == 'string'; 'a' != 'b'; a == 1;", vec![]);

        assert_eq!(problems.len(), 3);
        assert_eq!(problems[0].fix.as_ref().map(|f| f.text.as_str()), Some("==="));
        assert_eq!(problems[1].fix.as_ref().map(|f| f.text.as_str()), Some("!=="));
        assert!(problems[2].fix.is_none());
    }

    #[test]
    fn locates_operator_after_parenthesized_operand() {
        let problems = run_eqeqeq("(a /* == */) == b", vec![]);

        assert_eq!(problems[0].column, 14);
    }

    #[test]
    fn rejects_unknown_mode() {
        let config = LintConfig::new()
            .with_rule("eqeqeq", RuleEntry::error().with_options(vec![json!("sometimes")]));

        assert!(Linter::new().verify("a == b", &config, "test.js").is_err());
    }
}
