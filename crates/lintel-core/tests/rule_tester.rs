//! Behaviour of the rule testers themselves.

use lintel_core::config::globals::GlobalValue;
use lintel_core::config::{FlatLanguageOptions, SourceType};
use lintel_core::declare_rule;
use lintel_core::rules::quality::{Eqeqeq, NoConsole};
use lintel_core::rules::{Listeners, Report, Rule, RuleContext, RuleMeta};
use lintel_core::tester::{
    CaseKind, ExpectedError, ExpectedSuggestion, InvalidCase, Tests, ValidCase,
};
use lintel_core::{FlatRuleTester, RuleTester};
use serde_json::json;

declare_rule!(
    NoTestGlobal,
    name = "no-test-global",
    rule_type = Problem,
    description = "Requires a global named `test` and forbids one named `foo`",
    messages = [],
    schema = json!([]),
);

impl Rule for NoTestGlobal {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn create<'a>(&'a self, _ctx: &RuleContext<'a>) -> Listeners<'a> {
        Listeners::new().on("Program", |node, ctx| {
            let scopes = ctx.scope_manager();
            let names: Vec<&str> = ctx
                .scope()
                .variables
                .iter()
                .map(|id| scopes.variable(*id).name.as_str())
                .collect();

            if !names.contains(&"test") {
                ctx.report(Report::node(node).message("Global variable test was not defined."));
            }
            if names.contains(&"foo") {
                ctx.report(Report::node(node).message("Global variable foo should not be used."));
            }
        })
    }
}

#[test]
fn scope_based_rule_passes_its_fixtures() {
    let tests = Tests::new(
        vec![
            "var test = 'foo'".into(),
            ValidCase::new("var test2 = test").global("test", GlobalValue::Bool(true)),
        ],
        vec![
            InvalidCase::new("bar").errors(vec![
                ExpectedError::message("Global variable test was not defined.")
                    .node_type("Program"),
            ]),
            InvalidCase::new("var foo = test")
                .global("test", GlobalValue::Bool(false))
                .errors(vec![
                    ExpectedError::message("Global variable foo should not be used.")
                        .node_type("Program")
                        .at(1, 1),
                ]),
            InvalidCase::new("var foo").errors(vec![
                ExpectedError::message("Global variable test was not defined."),
                ExpectedError::message("Global variable foo should not be used."),
            ]),
        ],
    );

    RuleTester::new().run("no-test-global", NoTestGlobal::new(), tests);
}

#[test]
fn module_scope_hides_declarations_from_the_global_scope() {
    let tests = Tests::new(
        vec![ValidCase::new("var test;").language_options(
            FlatLanguageOptions::default().source_type(SourceType::Script),
        )],
        vec![InvalidCase::new("var test;").error_count(1)],
    );

    FlatRuleTester::new().run("no-test-global", NoTestGlobal::new(), tests);
}

#[test]
fn gathers_every_failure_before_reporting() {
    let tests = Tests::new(
        vec!["var foo".into(), "var test".into()],
        vec![
            InvalidCase::new("var test"),
            InvalidCase::new("bar").error_count(2),
        ],
    );

    let report = RuleTester::new()
        .try_run("no-test-global", NoTestGlobal::new(), tests)
        .unwrap_err();

    let failures: Vec<_> = report
        .failures
        .iter()
        .map(|failure| (failure.kind, failure.index))
        .collect();
    assert_eq!(
        failures,
        vec![(CaseKind::Valid, 0), (CaseKind::Invalid, 0), (CaseKind::Invalid, 1)]
    );
    assert_eq!(
        report.failures[1].message,
        "Invalid cases must have at least one error"
    );
    assert!(report.to_string().contains("valid case #0 \"var foo\""));
}

#[test]
fn rejects_message_and_message_id_together() {
    let tests = Tests::new(
        vec![],
        vec![InvalidCase::new("a == b").errors(vec![ExpectedError {
            message: Some("Expected '===' and instead saw '=='.".to_string()),
            ..ExpectedError::message_id("unexpected")
        }])],
    );

    let report = RuleTester::new()
        .try_run("eqeqeq", Eqeqeq::new(), tests)
        .unwrap_err();

    assert_eq!(
        report.failures[0].message,
        "error 1: Error should not specify both 'message' and a 'messageId'."
    );
}

#[test]
fn rejects_unknown_message_ids() {
    let tests = Tests::new(
        vec![],
        vec![InvalidCase::new("a == b").errors(vec![ExpectedError::message_id("loose")])],
    );

    let report = RuleTester::new()
        .try_run("eqeqeq", Eqeqeq::new(), tests)
        .unwrap_err();

    assert_eq!(
        report.failures[0].message,
        "error 1: Invalid messageId 'loose'. Expected one of 'unexpected'."
    );
}

#[test]
fn message_ids_need_declared_messages() {
    let tests = Tests::new(
        vec![],
        vec![InvalidCase::new("bar").errors(vec![ExpectedError::message_id("missing")])],
    );

    let report = RuleTester::new()
        .try_run("no-test-global", NoTestGlobal::new(), tests)
        .unwrap_err();

    assert_eq!(
        report.failures[0].message,
        "error 1: Cannot use 'messageId' if rule does not define 'meta.messages'."
    );
}

#[test]
fn changed_output_requires_fixable_rule() {
    let tests = Tests::new(
        vec![],
        vec![
            InvalidCase::new("bar")
                .error_count(1)
                .output("var test; bar"),
        ],
    );

    let report = RuleTester::new()
        .try_run("no-test-global", NoTestGlobal::new(), tests)
        .unwrap_err();

    assert_eq!(
        report.failures[0].message,
        "Fixable rules must set the `meta.fixable` property to \"code\" or \"whitespace\"."
    );
    assert!(report.failures[1].message.starts_with("Output is incorrect"));
}

#[test]
fn checks_fix_output_after_one_pass() {
    let tests = Tests::new(
        vec![],
        vec![
            InvalidCase::new("typeof a == 'x'; 'a' != 'b'")
                .error_count(2)
                .output("typeof a === 'x'; 'a' !== 'b'"),
            InvalidCase::new("a == b").error_count(1).output("a == b"),
        ],
    );

    RuleTester::new().run("eqeqeq", Eqeqeq::new(), tests);
}

#[test]
fn parse_errors_fail_the_case() {
    let tests = Tests::new(vec!["var = ;".into()], vec![]);

    let report = RuleTester::new()
        .try_run("eqeqeq", Eqeqeq::new(), tests)
        .unwrap_err();

    assert!(report.failures[0]
        .message
        .starts_with("A fatal parsing error occurred: Parsing error:"));
}

#[test]
fn legacy_tester_rejects_language_options() {
    let tests = Tests::new(
        vec![ValidCase::new("a === b").language_options(FlatLanguageOptions::default())],
        vec![],
    );

    let report = RuleTester::new()
        .try_run("eqeqeq", Eqeqeq::new(), tests)
        .unwrap_err();

    assert_eq!(
        report.failures[0].message,
        "`languageOptions` is not supported by RuleTester; use FlatRuleTester"
    );
}

#[test]
fn compares_suggestions_exactly() {
    let passing = Tests::new(
        vec![],
        vec![
            InvalidCase::new("foo();\nconsole.log(a);").errors(vec![
                ExpectedError::message_id("unexpected")
                    .node_type("MemberExpression")
                    .at(2, 1)
                    .end_at(2, 12)
                    .suggestions(vec![
                        ExpectedSuggestion::message_id("removeConsole", "foo();\n")
                            .data("propertyName", "log"),
                    ]),
            ]),
        ],
    );
    RuleTester::new().run("no-console", NoConsole::new(), passing);

    let failing = Tests::new(
        vec![],
        vec![InvalidCase::new("console.log(a);").errors(vec![
            ExpectedError::message_id("unexpected").no_suggestions(),
        ])],
    );
    let report = RuleTester::new()
        .try_run("no-console", NoConsole::new(), failing)
        .unwrap_err();
    assert_eq!(
        report.failures[0].message,
        "error 1: Expected no suggestions but had 1"
    );
}

#[test]
fn tests_load_from_json() {
    let tests = Tests::from_json(json!({
        "valid": [
            "a === b",
            { "code": "a == null", "options": ["always", { "null": "ignore" }] }
        ],
        "invalid": [{
            "code": "a == b",
            "errors": [{
                "messageId": "unexpected",
                "data": { "expectedOperator": "===", "actualOperator": "==" },
                "line": 1,
                "column": 3
            }]
        }]
    }))
    .unwrap();

    RuleTester::new().run("eqeqeq", Eqeqeq::new(), tests);
}

#[test]
#[should_panic(expected = "Hydrated message")]
fn wrong_data_panics() {
    let tests = Tests::new(
        vec![],
        vec![InvalidCase::new("a != b").errors(vec![
            ExpectedError::message_id("unexpected")
                .data("expectedOperator", "===")
                .data("actualOperator", "=="),
        ])],
    );

    RuleTester::new().run("eqeqeq", Eqeqeq::new(), tests);
}
