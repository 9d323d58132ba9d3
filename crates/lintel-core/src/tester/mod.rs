//! Rule testers.
//!
//! [`RuleTester`] configures cases through the legacy surface (`parserOptions`, `env`,
//! `globals`); [`FlatRuleTester`] through `languageOptions`. Both lint every case once
//! with only the rule under test enabled, check the problems against the expectations
//! and gather every discrepancy before failing.

pub mod cases;
pub mod failure;

use tracing::debug;

use crate::config::{FlatConfig, LanguageOptions, LegacyConfig, LintConfig, RuleEntry};
use crate::diagnostic::{Problem, Suggestion};
use crate::fix::apply_fixes;
use crate::linter::Linter;
use crate::parser::options_for_file;
use crate::rules::context::interpolate;
use crate::rules::{Rule, RuleMeta, RuleRegistry};
use crate::suggestion::{SuggestionError, apply_and_validate};

pub use cases::{
    CaseConfig, Errors, ExpectedError, ExpectedSuggestion, InvalidCase, SuggestionsExpectation,
    Tests, ValidCase,
};
pub use failure::{CaseKind, TesterFailure, TesterReport};

use cases::data_pairs;

const DEFAULT_FILENAME: &str = "test.js";

/// Tester for cases written against the legacy configuration surface.
#[derive(Debug, Clone, Default)]
pub struct RuleTester {
    base: LegacyConfig,
}

impl RuleTester {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cases are merged over `base`; case fields win.
    pub fn with_config(base: LegacyConfig) -> Self {
        Self { base }
    }

    /// Runs `tests`, panicking with the full report if any case fails.
    pub fn run<R: Rule + 'static>(&self, name: &str, rule: R, tests: Tests) {
        if let Err(report) = self.try_run(name, rule, tests) {
            panic!("{}", report);
        }
    }

    pub fn try_run<R: Rule + 'static>(
        &self,
        name: &str,
        rule: R,
        tests: Tests,
    ) -> Result<(), TesterReport> {
        Harness::new(name, Box::new(rule), Surface::Legacy(&self.base)).run(&tests)
    }
}

/// Tester for cases written against `languageOptions`.
#[derive(Debug, Clone, Default)]
pub struct FlatRuleTester {
    base: FlatConfig,
}

impl FlatRuleTester {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(base: FlatConfig) -> Self {
        Self { base }
    }

    pub fn run<R: Rule + 'static>(&self, name: &str, rule: R, tests: Tests) {
        if let Err(report) = self.try_run(name, rule, tests) {
            panic!("{}", report);
        }
    }

    pub fn try_run<R: Rule + 'static>(
        &self,
        name: &str,
        rule: R,
        tests: Tests,
    ) -> Result<(), TesterReport> {
        Harness::new(name, Box::new(rule), Surface::Flat(&self.base)).run(&tests)
    }
}

enum Surface<'c> {
    Legacy(&'c LegacyConfig),
    Flat(&'c FlatConfig),
}

impl Surface<'_> {
    /// The lint config of one case, with `rule` as the only enabled rule.
    fn config_for(&self, rule: &str, case: &CaseConfig) -> Result<LintConfig, String> {
        let entry = RuleEntry::error().with_options(case.options.clone());
        let mut config = match self {
            Surface::Legacy(base) => {
                if case.language_options.is_some() {
                    return Err(
                        "`languageOptions` is not supported by RuleTester; use FlatRuleTester"
                            .to_string(),
                    );
                }
                let overlay = LegacyConfig {
                    parser_options: case.parser_options.clone().unwrap_or_default(),
                    env: case.env.clone().unwrap_or_default(),
                    globals: case.globals.clone().unwrap_or_default(),
                    settings: case.settings.clone(),
                    ..LegacyConfig::default()
                };
                base.merge(&overlay).to_lint_config()
            }
            Surface::Flat(base) => {
                let legacy = case.legacy_fields();
                if !legacy.is_empty() {
                    return Err(format!(
                        "`{}` is not supported by FlatRuleTester; use `languageOptions`",
                        legacy.join("`, `")
                    ));
                }
                let overlay = FlatConfig {
                    language_options: case.language_options.clone().unwrap_or_default(),
                    settings: case.settings.clone(),
                    ..FlatConfig::default()
                };
                base.merge(&overlay).to_lint_config()
            }
        }
        .map_err(|error| error.to_string())?;

        config.rules.clear();
        config.rules.insert(rule.to_string(), entry);
        Ok(config)
    }
}

struct Linted {
    problems: Vec<Problem>,
    options: LanguageOptions,
}

struct Harness<'c> {
    name: String,
    meta: RuleMeta,
    linter: Linter,
    surface: Surface<'c>,
}

impl<'c> Harness<'c> {
    fn new(name: &str, rule: Box<dyn Rule>, surface: Surface<'c>) -> Self {
        let meta = rule.meta().clone();
        let mut registry = RuleRegistry::new();
        registry.register_as(name, rule);
        Self {
            name: name.to_string(),
            meta,
            linter: Linter::with_registry(registry),
            surface,
        }
    }

    fn run(&self, tests: &Tests) -> Result<(), TesterReport> {
        debug!(
            rule = %self.name,
            valid = tests.valid.len(),
            invalid = tests.invalid.len(),
            "running rule tests"
        );
        let mut failures = Vec::new();

        for (index, case) in tests.valid.iter().enumerate() {
            for message in self.check_valid(case) {
                failures.push(TesterFailure {
                    kind: CaseKind::Valid,
                    index,
                    code: case.code.clone(),
                    name: case.name.clone(),
                    message,
                });
            }
        }
        for (index, case) in tests.invalid.iter().enumerate() {
            for message in self.check_invalid(case) {
                failures.push(TesterFailure {
                    kind: CaseKind::Invalid,
                    index,
                    code: case.code.clone(),
                    name: case.name.clone(),
                    message,
                });
            }
        }

        if failures.is_empty() {
            return Ok(());
        }
        Err(TesterReport {
            rule: self.name.clone(),
            cases: tests.valid.len() + tests.invalid.len(),
            failures,
        })
    }

    fn lint(&self, code: &str, case: &CaseConfig) -> Result<Linted, String> {
        let config = self.surface.config_for(&self.name, case)?;
        let filename = case.filename.as_deref().unwrap_or(DEFAULT_FILENAME);
        let problems = self
            .linter
            .verify(code, &config, filename)
            .map_err(|error| error.to_string())?;
        if let Some(fatal) = problems.iter().find(|problem| problem.fatal) {
            return Err(format!("A fatal parsing error occurred: {}", fatal.message));
        }
        Ok(Linted {
            problems,
            options: options_for_file(filename, &config.language_options),
        })
    }

    fn check_valid(&self, case: &ValidCase) -> Vec<String> {
        match self.lint(&case.code, &case.config) {
            Err(message) => vec![message],
            Ok(linted) if linted.problems.is_empty() => Vec::new(),
            Ok(linted) => vec![format!(
                "Should have no errors but had {}: {}",
                linted.problems.len(),
                describe(&linted.problems)
            )],
        }
    }

    fn check_invalid(&self, case: &InvalidCase) -> Vec<String> {
        if case.errors.is_empty() {
            return vec!["Invalid cases must have at least one error".to_string()];
        }

        let mut failures = Vec::new();
        if let Errors::List(expected) = &case.errors {
            for (index, error) in expected.iter().enumerate() {
                for message in self.check_declaration(error) {
                    failures.push(format!("error {}: {}", index + 1, message));
                }
            }
        }
        if !failures.is_empty() {
            return failures;
        }

        let linted = match self.lint(&case.code, &case.config) {
            Ok(linted) => linted,
            Err(message) => return vec![message],
        };
        let problems = &linted.problems;

        if problems.len() != case.errors.len() {
            failures.push(format!(
                "Should have {} error(s) but had {}: {}",
                case.errors.len(),
                problems.len(),
                describe(problems)
            ));
        } else if let Errors::List(expected) = &case.errors {
            for (index, (error, problem)) in expected.iter().zip(problems).enumerate() {
                for message in self.check_error(&case.code, error, problem, &linted.options) {
                    failures.push(format!("error {}: {}", index + 1, message));
                }
            }
        }

        failures.extend(self.check_output(case, problems));
        failures
    }

    /// Mistakes in the expectation itself, found before anything is linted.
    fn check_declaration(&self, error: &ExpectedError) -> Vec<String> {
        let mut failures = Vec::new();
        if error.message.is_some() && error.message_id.is_some() {
            failures.push("Error should not specify both 'message' and a 'messageId'.".to_string());
        }
        if error.data.is_some() && error.message_id.is_none() {
            failures.push("Error must specify 'messageId' if 'data' is used.".to_string());
        }
        if let Some(id) = &error.message_id {
            failures.extend(self.check_message_id(id));
        }
        if let SuggestionsExpectation::Exactly(suggestions) = &error.suggestions {
            for suggestion in suggestions {
                if suggestion.desc.is_some() && suggestion.message_id.is_some() {
                    failures.push(
                        "Suggestion should not specify both 'desc' and 'messageId'.".to_string(),
                    );
                }
                if let Some(id) = &suggestion.message_id {
                    failures.extend(self.check_message_id(id));
                }
            }
        }
        failures
    }

    fn check_message_id(&self, id: &str) -> Option<String> {
        if self.meta.messages.is_empty() {
            return Some(
                "Cannot use 'messageId' if rule does not define 'meta.messages'.".to_string(),
            );
        }
        if self.meta.message(id).is_some() {
            return None;
        }
        let known: Vec<String> = self
            .meta
            .messages
            .iter()
            .map(|(key, _)| format!("'{}'", key))
            .collect();
        Some(format!(
            "Invalid messageId '{}'. Expected one of {}.",
            id,
            known.join(", ")
        ))
    }

    fn check_error(
        &self,
        code: &str,
        expected: &ExpectedError,
        actual: &Problem,
        options: &LanguageOptions,
    ) -> Vec<String> {
        let mut failures = Vec::new();

        if let Some(message) = &expected.message {
            if actual.message != *message {
                failures.push(format!(
                    "Expected message {:?} but got {:?}",
                    message, actual.message
                ));
            }
        }
        if let Some(id) = &expected.message_id {
            if actual.message_id.as_deref() != Some(id.as_str()) {
                failures.push(format!(
                    "Expected messageId {:?} but got {:?}",
                    id, actual.message_id
                ));
            } else if let Some(data) = &expected.data {
                let template = self.meta.message(id).unwrap_or_default();
                let hydrated = interpolate(template, &data_pairs(data));
                if actual.message != hydrated {
                    failures.push(format!(
                        "Hydrated message {:?} does not match {:?}",
                        hydrated, actual.message
                    ));
                }
            }
        }

        if let Some(node_type) = &expected.node_type {
            if actual.node_type.as_deref() != Some(node_type.as_str()) {
                failures.push(format!(
                    "Expected type {:?} but got {:?}",
                    node_type, actual.node_type
                ));
            }
        }

        let positions = [
            ("line", expected.line, Some(actual.line)),
            ("column", expected.column, Some(actual.column)),
            ("endLine", expected.end_line, actual.end_line),
            ("endColumn", expected.end_column, actual.end_column),
        ];
        for (field, expected, actual) in positions {
            if expected.is_some() && expected != actual {
                failures.push(format!(
                    "Expected {} {:?} but got {:?}",
                    field, expected, actual
                ));
            }
        }

        match &expected.suggestions {
            SuggestionsExpectation::Unchecked => {}
            SuggestionsExpectation::None => {
                if !actual.suggestions.is_empty() {
                    failures.push(format!(
                        "Expected no suggestions but had {}",
                        actual.suggestions.len()
                    ));
                }
            }
            SuggestionsExpectation::Exactly(suggestions) => {
                if suggestions.len() != actual.suggestions.len() {
                    failures.push(format!(
                        "Expected {} suggestion(s) but had {}",
                        suggestions.len(),
                        actual.suggestions.len()
                    ));
                } else {
                    for (index, (expected, actual)) in
                        suggestions.iter().zip(&actual.suggestions).enumerate()
                    {
                        for message in self.check_suggestion(code, expected, actual, options) {
                            failures.push(format!("suggestion {}: {}", index + 1, message));
                        }
                    }
                }
            }
        }

        failures
    }

    fn check_suggestion(
        &self,
        code: &str,
        expected: &ExpectedSuggestion,
        actual: &Suggestion,
        options: &LanguageOptions,
    ) -> Vec<String> {
        let mut failures = Vec::new();

        if let Some(desc) = &expected.desc {
            if actual.desc != *desc {
                failures.push(format!("Expected desc {:?} but got {:?}", desc, actual.desc));
            }
        }
        if let Some(id) = &expected.message_id {
            if actual.message_id.as_deref() != Some(id.as_str()) {
                failures.push(format!(
                    "Expected messageId {:?} but got {:?}",
                    id, actual.message_id
                ));
            } else if let Some(data) = &expected.data {
                let template = self.meta.message(id).unwrap_or_default();
                let hydrated = interpolate(template, &data_pairs(data));
                if actual.desc != hydrated {
                    failures.push(format!(
                        "Hydrated desc {:?} does not match {:?}",
                        hydrated, actual.desc
                    ));
                }
            }
        }

        match apply_and_validate(code, actual, options) {
            Ok(output) if output == expected.output => {}
            Ok(output) => failures.push(format!(
                "Expected the applied suggestion to give {:?} but got {:?}",
                expected.output, output
            )),
            Err(SuggestionError::Unparsable(error)) => failures.push(format!(
                "A fatal parsing error occurred in suggestion fix: {}",
                error
            )),
            Err(error) => failures.push(error.to_string()),
        }

        failures
    }

    fn check_output(&self, case: &InvalidCase, problems: &[Problem]) -> Vec<String> {
        let pass = apply_fixes(&case.code, problems, |_| true);
        let mut failures = Vec::new();
        match &case.output {
            Some(expected) => {
                if *expected != case.code && self.meta.fixable.is_none() {
                    failures.push(
                        "Fixable rules must set the `meta.fixable` property to \"code\" or \"whitespace\"."
                            .to_string(),
                    );
                }
                if pass.output != *expected {
                    failures.push(format!(
                        "Output is incorrect: expected {:?} but got {:?}",
                        expected, pass.output
                    ));
                }
            }
            None => {
                if pass.applied > 0 {
                    failures.push(format!(
                        "The rule fixed the code. Please add 'output' property. Output: {:?}",
                        pass.output
                    ));
                }
            }
        }
        failures
    }
}

fn describe(problems: &[Problem]) -> String {
    let entries: Vec<String> = problems
        .iter()
        .map(|problem| format!("{}:{} {}", problem.line, problem.column, problem.message))
        .collect();
    format!("[{}]", entries.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::quality::{Eqeqeq, NoConsole};
    use serde_json::json;

    #[test]
    fn passing_cases_produce_no_report() {
        let tests = Tests::new(
            vec!["a === b".into()],
            vec![
                InvalidCase::new("a == b")
                    .errors(vec![ExpectedError::message_id("unexpected")
                        .data("expectedOperator", "===")
                        .data("actualOperator", "==")
                        .at(1, 3)
                        .end_at(1, 5)]),
            ],
        );

        assert!(RuleTester::new().try_run("eqeqeq", Eqeqeq::new(), tests).is_ok());
    }

    #[test]
    fn valid_case_with_problems_fails() {
        let tests = Tests::new(vec!["a == b".into()], vec![]);

        let report = RuleTester::new()
            .try_run("eqeqeq", Eqeqeq::new(), tests)
            .unwrap_err();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].kind, CaseKind::Valid);
        assert!(report.failures[0].message.starts_with("Should have no errors but had 1"));
    }

    #[test]
    fn missing_output_asserts_no_fix() {
        let tests = Tests::new(
            vec![],
            vec![InvalidCase::new("typeof a == 'string'").error_count(1)],
        );

        let report = RuleTester::new()
            .try_run("eqeqeq", Eqeqeq::new(), tests)
            .unwrap_err();

        assert!(report.failures[0].message.contains("Please add 'output' property"));
    }

    #[test]
    fn flat_tester_rejects_legacy_fields() {
        let tests = Tests::new(vec![ValidCase::new("a === b").env("node")], vec![]);

        let report = FlatRuleTester::new()
            .try_run("eqeqeq", Eqeqeq::new(), tests)
            .unwrap_err();

        assert_eq!(
            report.failures[0].message,
            "`env` is not supported by FlatRuleTester; use `languageOptions`"
        );
    }

    #[test]
    fn schema_violations_fail_the_case() {
        let tests = Tests::new(
            vec![ValidCase::new("console.log(1)").options(vec![json!({"allow": "log"})])],
            vec![],
        );

        let report = RuleTester::new()
            .try_run("no-console", NoConsole::new(), tests)
            .unwrap_err();

        assert!(report.failures[0]
            .message
            .starts_with("Configuration for rule \"no-console\" is invalid"));
    }

    #[test]
    #[should_panic(expected = "Should have 2 error(s) but had 1")]
    fn run_panics_with_the_report() {
        let tests = Tests::new(vec![], vec![InvalidCase::new("a != b").error_count(2)]);

        RuleTester::new().run("eqeqeq", Eqeqeq::new(), tests);
    }
}
