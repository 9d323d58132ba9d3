//! no-undef: disallow references to undeclared variables.

use serde_json::{Value, json};

use crate::ast::Node;
use crate::declare_rule;
use crate::rules::{Listeners, Report, Rule, RuleContext, RuleMeta};

declare_rule!(
    NoUndef,
    name = "no-undef",
    rule_type = Problem,
    description = "Disallow the use of undeclared variables unless mentioned in global comments or configuration",
    messages = [("undef", "'{{name}}' is not defined.")],
    schema = json!([{
        "type": "object",
        "properties": { "typeof": { "type": "boolean" } },
        "additionalProperties": false
    }]),
    docs_url = "https://eslint.org/docs/latest/rules/no-undef",
);

fn is_typeof_operand(identifier: Node<'_>) -> bool {
    identifier
        .parent_skip_parens()
        .is_some_and(|(parent, _)| {
            parent.is("UnaryExpression") && parent.str_attr("operator") == Some("typeof")
        })
}

impl Rule for NoUndef {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn create<'a>(&'a self, ctx: &RuleContext<'a>) -> Listeners<'a> {
        let check_typeof = ctx
            .option(0)
            .and_then(|config| config.get("typeof"))
            .and_then(Value::as_bool)
            .unwrap_or(false);

        Listeners::new().on_end(move |_, ctx| {
            let scopes = ctx.scope_manager();
            let ast = ctx.ast();

            for reference in scopes.through(scopes.global_scope().id) {
                let identifier = ast.node(reference.identifier);
                if !check_typeof && is_typeof_operand(identifier) {
                    continue;
                }
                let name = identifier.name().unwrap_or_default();
                ctx.report(
                    Report::node(identifier)
                        .message_id("undef")
                        .data("name", name),
                );
            }
        })
    }
}
