//! no-console: disallow `console.*` calls.
//!
//! Methods listed in `allow` are skipped. A call that forms a whole expression
//! statement gets a suggestion that removes the statement.

use serde_json::{Value, json};

use crate::ast::Node;
use crate::declare_rule;
use crate::rules::helpers::property_name;
use crate::rules::{Listeners, Report, Rule, RuleContext, RuleMeta, Suggest};
use crate::source_code::SourceCode;

declare_rule!(
    NoConsole,
    name = "no-console",
    rule_type = Suggestion,
    description = "Disallow the use of `console`",
    messages = [
        ("unexpected", "Unexpected console statement."),
        ("removeConsole", "Remove the console.{{ propertyName }}()."),
    ],
    has_suggestions = true,
    schema = json!([{
        "type": "object",
        "properties": {
            "allow": {
                "type": "array",
                "items": { "type": "string" },
                "minItems": 1,
                "uniqueItems": true
            }
        },
        "additionalProperties": false
    }]),
    docs_url = "https://eslint.org/docs/latest/rules/no-console",
);

/// First characters that would join the next statement onto the previous one
/// once a statement without a semicolon disappears.
const ASI_HAZARD_STARTS: &[char] = &['(', '[', '`', '+', '-', '/', '*', ',', '.'];

fn allowed_methods(options: &[Value]) -> Vec<String> {
    options
        .first()
        .and_then(|config| config.get("allow"))
        .and_then(Value::as_array)
        .map(|methods| {
            methods
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

impl Rule for NoConsole {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn create<'a>(&'a self, ctx: &RuleContext<'a>) -> Listeners<'a> {
        let allow = allowed_methods(ctx.options());

        Listeners::new().on_end(move |_, ctx| {
            let scopes = ctx.scope_manager();
            let ast = ctx.ast();
            let global = scopes.global_scope();

            let identifiers: Vec<Node<'a>> = match global.set.get("console") {
                Some(variable) => {
                    let variable = scopes.variable(*variable);
                    if !variable.defs.is_empty() {
                        return;
                    }
                    scopes
                        .references_of(variable.id)
                        .map(|reference| ast.node(reference.identifier))
                        .collect()
                }
                None => scopes
                    .through(global.id)
                    .map(|reference| ast.node(reference.identifier))
                    .filter(|identifier| identifier.name() == Some("console"))
                    .collect(),
            };

            for identifier in identifiers {
                let Some(member) = identifier.parent() else {
                    continue;
                };
                if !member.is("MemberExpression") || member.child("object") != Some(identifier) {
                    continue;
                }
                let method = property_name(member);
                if method.is_some_and(|name| allow.iter().any(|allowed| allowed == name)) {
                    continue;
                }
                report(ctx, member, method);
            }
        })
    }
}

fn report<'a>(ctx: &RuleContext<'a>, member: Node<'a>, method: Option<&'a str>) {
    let mut report = Report::node(member).message_id("unexpected");
    if let (Some(statement), Some(method)) = (removable_statement(member), method) {
        let replacement = if is_asi_hazard(ctx.source_code(), statement) { ";" } else { "" };
        report = report.suggest(
            Suggest::message_id("removeConsole", move |fixer| {
                fixer.replace_text(statement, replacement)
            })
            .data("propertyName", method),
        );
    }
    ctx.report(report);
}

/// The expression statement a `console.x(...)` call makes up on its own.
fn removable_statement(member: Node<'_>) -> Option<Node<'_>> {
    let call = member.parent().filter(|call| call.is("CallExpression"))?;
    if call.child("callee") != Some(member) {
        return None;
    }
    call.parent().filter(|statement| statement.is("ExpressionStatement"))
}

fn is_asi_hazard(source: &SourceCode, statement: Node<'_>) -> bool {
    let Some(before) = source.token_before(statement.start()) else {
        return false;
    };
    if [";", "{", "}"].iter().any(|end| before.is_punctuator(end)) {
        return false;
    }
    source
        .token_after(statement.end())
        .is_some_and(|after| after.value.starts_with(ASI_HAZARD_STARTS))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::config::{LintConfig, RuleEntry};
    use crate::diagnostic::Problem;
    use crate::linter::Linter;
    use crate::suggestion::apply_suggestion;

    fn run_no_console(code: &str, options: Vec<serde_json::Value>) -> Vec<Problem> {
        let config =
            LintConfig::new().with_rule("no-console", RuleEntry::error().with_options(options));
        Linter::new().verify(code, &config, "test.js").unwrap()
    }

    #[test]
    fn detects_console_calls() {
        let problems = run_no_console("console.log('debug');\nconsole.error(e);", vec![]);

        assert_eq!(problems.len(), 2);
        assert_eq!(problems[0].message, "Unexpected console statement.");
        assert_eq!(problems[0].node_type.as_deref(), Some("MemberExpression"));
        assert_eq!((problems[1].line, problems[1].column), (2, 1));
    }

    #[test]
    fn allow_list_skips_methods() {
        let problems = run_no_console(
            "console.warn('a'); console.error('b'); console.log('c');",
            vec![json!({"allow": ["warn", "error"]})],
        );

        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].column, 40);
    }

    #[test]
    fn shadowed_console_is_ignored() {
        assert!(run_no_console("var console = logger; console.log(1);", vec![]).is_empty());
        assert!(run_no_console("function f(console) { console.log(1); }", vec![]).is_empty());
    }

    #[test]
    fn suggestion_removes_whole_statement() {
        let source = "foo();\nconsole.log('x');\nbar();";
        let problems = run_no_console(source, vec![]);

        let suggestion = &problems[0].suggestions[0];
        assert_eq!(suggestion.desc, "Remove the console.log().");
        assert_eq!(apply_suggestion(source, suggestion).unwrap(), "foo();\n\nbar();");
    }

    #[test]
    fn no_suggestion_inside_expressions() {
        let problems = run_no_console("var x = console.log('x');", vec![]);

        assert_eq!(problems.len(), 1);
        assert!(problems[0].suggestions.is_empty());
    }

    #[test]
    fn suggestion_keeps_statements_apart() {
        let source = "foo()\nconsole.log('x');\n(bar || baz)()";
        let problems = run_no_console(source, vec![]);

        let fixed = apply_suggestion(source, &problems[0].suggestions[0]).unwrap();
        assert_eq!(fixed, "foo()\n;\n(bar || baz)()");
    }

    #[test]
    fn comments_do_not_hide_hazards() {
        let source = "foo() // done;\nconsole.log('x');\n/* next */ [1].map(f)";
        let problems = run_no_console(source, vec![]);

        let fixed = apply_suggestion(source, &problems[0].suggestions[0]).unwrap();
        assert_eq!(fixed, "foo() // done;\n;\n/* next */ [1].map(f)");
    }

    #[test]
    fn rejects_empty_allow_list() {
        let config = LintConfig::new().with_rule(
            "no-console",
            RuleEntry::error().with_options(vec![json!({"allow": []})]),
        );

        assert!(Linter::new().verify("console.log(1)", &config, "test.js").is_err());
    }
}
