//! The lint pipeline: parse, scope analysis, traversal, collection and autofix.

use rayon::prelude::*;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::collector::finalize;
use crate::config::schema::validate_options;
use crate::config::{ConfigError, LanguageOptions, LintConfig};
use crate::diagnostic::{Problem, Severity};
use crate::directives::DisableDirectives;
use crate::fix::{FixOptions, apply_fixes};
use crate::parser::{options_for_file, parse};
use crate::rules::context::FileContext;
use crate::rules::{Rule, RuleContext, RuleRegistry, RuleType, default_registry};
use crate::semantic::analyze;
use crate::traversal::{RuleRun, traverse};

#[derive(Debug, thiserror::Error)]
pub enum LintError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Rule \"{rule_id}\" failed at {line}:{column}: {message}")]
    RuleRuntime {
        rule_id: String,
        line: usize,
        column: usize,
        message: String,
    },
}

/// Outcome of [`Linter::verify_and_fix`].
#[derive(Debug, Clone, PartialEq)]
pub struct FixReport {
    /// The last text produced; equal to the input when nothing was fixed.
    pub output: String,
    pub fixed: bool,
    pub passes: usize,
    /// Problems of `output`.
    pub problems: Vec<Problem>,
    pub cancelled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub filename: String,
    pub source: String,
}

impl SourceFile {
    pub fn new(filename: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            source: source.into(),
        }
    }
}

pub struct Linter {
    registry: RuleRegistry,
}

impl Linter {
    pub fn new() -> Self {
        Self::with_registry(default_registry())
    }

    pub fn with_registry(registry: RuleRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    pub fn define_rule(&mut self, id: &str, rule: Box<dyn Rule>) {
        self.registry.register_as(id, rule);
    }

    /// Checks that every configured rule exists, that enabled rules get valid options
    /// and that their listeners use well-formed selectors.
    pub fn validate_config(&self, config: &LintConfig) -> Result<(), ConfigError> {
        for (name, entry) in &config.rules {
            let rule = self
                .registry
                .get(name)
                .ok_or_else(|| ConfigError::UnknownRule(name.clone()))?;
            if entry.severity.to_severity().is_none() {
                continue;
            }
            if let Some(schema) = &rule.meta().schema {
                validate_options(schema, &entry.options).map_err(|message| {
                    ConfigError::InvalidOptions {
                        rule: name.clone(),
                        message,
                    }
                })?;
            }
        }
        self.validate_selectors(config)
    }

    /// Creates each enabled rule's listeners over an empty program, so a malformed
    /// selector is reported before any source is parsed.
    fn validate_selectors(&self, config: &LintConfig) -> Result<(), ConfigError> {
        let options = &config.language_options;
        let Ok(empty) = parse("", options) else {
            return Ok(());
        };
        let scopes = analyze(empty.ast(), options);
        let file_ctx = FileContext {
            file: &empty,
            scopes: &scopes,
            language_options: options,
            settings: &config.settings,
            filename: "",
            problems: Default::default(),
        };

        for (id, rule, severity, rule_options) in self.active_rules(config) {
            let ctx = RuleContext::new(&file_ctx, id, rule.meta(), severity, rule_options);
            let listeners = rule.create(&ctx);
            RuleRun::prepare(ctx, listeners)?;
        }
        Ok(())
    }

    /// Lints `source` once.
    ///
    /// A parse failure yields `Ok` with a single fatal problem.
    #[instrument(skip(self, source, config), level = "debug")]
    pub fn verify(
        &self,
        source: &str,
        config: &LintConfig,
        filename: &str,
    ) -> Result<Vec<Problem>, LintError> {
        self.validate_config(config)?;
        let options = options_for_file(filename, &config.language_options);
        self.run_pass(source, config, &options, filename)
    }

    /// Lints and fixes `source` until no fix applies, the pass limit is hit or the
    /// cancel flag is raised.
    #[instrument(skip(self, source, config, fix), level = "debug")]
    pub fn verify_and_fix(
        &self,
        source: &str,
        config: &LintConfig,
        filename: &str,
        fix: &FixOptions,
    ) -> Result<FixReport, LintError> {
        self.validate_config(config)?;
        let options = options_for_file(filename, &config.language_options);

        let mut output = source.to_string();
        let mut problems = self.run_pass(&output, config, &options, filename)?;
        let mut passes = 0;
        let mut cancelled = false;

        loop {
            if passes >= fix.max_passes {
                debug!(passes, "fix pass limit reached");
                break;
            }
            if fix.is_cancelled() {
                debug!(passes, "fixing cancelled");
                cancelled = true;
                break;
            }

            let pass = apply_fixes(&output, &problems, |problem| {
                fix.allows(self.rule_type_of(problem))
            });
            if pass.applied == 0 {
                break;
            }

            passes += 1;
            debug!(pass = passes, applied = pass.applied, "applied fixes");
            output = pass.output;
            problems = self.run_pass(&output, config, &options, filename)?;
        }

        Ok(FixReport {
            fixed: passes > 0,
            output,
            passes,
            problems,
            cancelled,
        })
    }

    /// Lints independent files in parallel. Results keep the input order.
    pub fn verify_batch(
        &self,
        files: &[SourceFile],
        config: &LintConfig,
    ) -> Vec<Result<Vec<Problem>, LintError>> {
        debug!(files = files.len(), "linting batch");
        files
            .par_iter()
            .map(|file| self.verify(&file.source, config, &file.filename))
            .collect()
    }

    fn rule_type_of(&self, problem: &Problem) -> Option<RuleType> {
        let id = problem.rule_id.as_deref()?;
        self.registry.get(id).map(|rule| rule.meta().rule_type)
    }

    fn active_rules<'r>(
        &'r self,
        config: &'r LintConfig,
    ) -> Vec<(&'r str, &'r dyn Rule, Severity, &'r [Value])> {
        self.registry
            .rules()
            .filter_map(|(id, rule)| {
                let entry = config.rule(id)?;
                let severity = entry.severity.to_severity()?;
                Some((id, rule, severity, entry.options.as_slice()))
            })
            .collect()
    }

    fn run_pass(
        &self,
        source: &str,
        config: &LintConfig,
        options: &LanguageOptions,
        filename: &str,
    ) -> Result<Vec<Problem>, LintError> {
        let file = match parse(source, options) {
            Ok(file) => file,
            Err(error) => {
                debug!(filename, line = error.line, "parse failed");
                return Ok(vec![Problem::parse_failure(
                    &error.message,
                    error.line,
                    error.column,
                )]);
            }
        };
        let scopes = analyze(file.ast(), options);

        let file_ctx = FileContext {
            file: &file,
            scopes: &scopes,
            language_options: options,
            settings: &config.settings,
            filename,
            problems: Default::default(),
        };

        let active = self.active_rules(config);
        debug!(filename, rules = active.len(), nodes = file.ast().len(), "traversing");
        {
            let mut runs = Vec::with_capacity(active.len());
            for (id, rule, severity, rule_options) in active {
                let ctx = RuleContext::new(&file_ctx, id, rule.meta(), severity, rule_options);
                let listeners = rule.create(&ctx);
                if listeners.is_empty() {
                    continue;
                }
                runs.push(RuleRun::prepare(ctx, listeners)?);
            }
            traverse(file.ast(), &mut runs)?;
        }

        let problems = file_ctx.problems.into_inner();
        let directives = (!config.no_inline_config)
            .then(|| DisableDirectives::from_source_code(file.source_code()))
            .filter(|directives| !directives.is_empty());
        Ok(finalize(problems, directives.as_ref()))
    }
}

impl Default for Linter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuleEntry;
    use crate::diagnostic::Edit;
    use crate::rules::{Listeners, Report, RuleMeta, Suggest};
    use serde_json::json;

    fn config(rules: &[(&str, RuleEntry)]) -> LintConfig {
        let mut config = LintConfig::new();
        for (name, entry) in rules {
            config = config.with_rule(name, entry.clone());
        }
        config
    }

    crate::declare_rule!(
        ReportIdentifiers,
        name = "report-identifiers",
        rule_type = Problem,
        description = "Reports every identifier",
        messages = [("found", "Found '{{name}}'.")],
    );

    impl Rule for ReportIdentifiers {
        fn meta(&self) -> &RuleMeta {
            &self.meta
        }

        fn create<'a>(&'a self, _ctx: &RuleContext<'a>) -> Listeners<'a> {
            Listeners::new().on("Identifier", |node, ctx| {
                ctx.report(
                    Report::node(node)
                        .message_id("found")
                        .data("name", node.name().unwrap_or_default()),
                );
            })
        }
    }

    crate::declare_rule!(
        Panics,
        name = "panics",
        rule_type = Problem,
        description = "Panics on the first identifier",
        messages = [],
    );

    impl Rule for Panics {
        fn meta(&self) -> &RuleMeta {
            &self.meta
        }

        fn create<'a>(&'a self, _ctx: &RuleContext<'a>) -> Listeners<'a> {
            Listeners::new().on("Identifier", |_, _| panic!("boom"))
        }
    }

    crate::declare_rule!(
        BadSelector,
        name = "bad-selector",
        rule_type = Problem,
        description = "Registers a malformed selector",
        messages = [],
    );

    impl Rule for BadSelector {
        fn meta(&self) -> &RuleMeta {
            &self.meta
        }

        fn create<'a>(&'a self, _ctx: &RuleContext<'a>) -> Listeners<'a> {
            Listeners::new().on("Identifier[name=", |_, _| {})
        }
    }

    crate::declare_rule!(
        FixesUndeclared,
        name = "fixes-undeclared",
        rule_type = Suggestion,
        description = "Fixes without declaring `fixable`",
        messages = [],
    );

    impl Rule for FixesUndeclared {
        fn meta(&self) -> &RuleMeta {
            &self.meta
        }

        fn create<'a>(&'a self, _ctx: &RuleContext<'a>) -> Listeners<'a> {
            Listeners::new().on("Identifier", |node, ctx| {
                ctx.report(
                    Report::node(node)
                        .message("Rename.")
                        .fix(move |fixer| fixer.replace_text(node, "x")),
                );
            })
        }
    }

    crate::declare_rule!(
        SuggestsUndeclared,
        name = "suggests-undeclared",
        rule_type = Suggestion,
        description = "Suggests without declaring `has_suggestions`",
        messages = [],
    );

    impl Rule for SuggestsUndeclared {
        fn meta(&self) -> &RuleMeta {
            &self.meta
        }

        fn create<'a>(&'a self, _ctx: &RuleContext<'a>) -> Listeners<'a> {
            Listeners::new().on("Identifier", |node, ctx| {
                ctx.report(
                    Report::node(node)
                        .message("Remove.")
                        .suggest(Suggest::desc("Remove it.", move |fixer| fixer.remove(node))),
                );
            })
        }
    }

    crate::declare_rule!(
        Silent,
        name = "silent",
        rule_type = Problem,
        description = "Reports without a message",
        messages = [],
    );

    impl Rule for Silent {
        fn meta(&self) -> &RuleMeta {
            &self.meta
        }

        fn create<'a>(&'a self, _ctx: &RuleContext<'a>) -> Listeners<'a> {
            Listeners::new().on("Identifier", |node, ctx| ctx.report(Report::node(node)))
        }
    }

    crate::declare_rule!(
        EmptySuggestion,
        name = "empty-suggestion",
        rule_type = Suggestion,
        description = "Offers a suggestion whose fixer builds nothing",
        messages = [("found", "Found.")],
        has_suggestions = true,
    );

    impl Rule for EmptySuggestion {
        fn meta(&self) -> &RuleMeta {
            &self.meta
        }

        fn create<'a>(&'a self, _ctx: &RuleContext<'a>) -> Listeners<'a> {
            Listeners::new().on("Identifier", |node, ctx| {
                ctx.report(
                    Report::node(node)
                        .message_id("found")
                        .suggest(Suggest::desc("Nothing.", |_| None::<Edit>)),
                );
            })
        }
    }

    fn linter() -> Linter {
        let mut linter = Linter::new();
        linter.define_rule("report-identifiers", Box::new(ReportIdentifiers::new()));
        linter.define_rule("panics", Box::new(Panics::new()));
        linter.define_rule("bad-selector", Box::new(BadSelector::new()));
        linter.define_rule("fixes-undeclared", Box::new(FixesUndeclared::new()));
        linter.define_rule("suggests-undeclared", Box::new(SuggestsUndeclared::new()));
        linter.define_rule("silent", Box::new(Silent::new()));
        linter.define_rule("empty-suggestion", Box::new(EmptySuggestion::new()));
        linter
    }

    #[test]
    fn verify_reports_in_position_order() {
        let problems = linter()
            .verify(
                "var b = a;\nc;",
                &config(&[("report-identifiers", RuleEntry::error())]),
                "test.js",
            )
            .unwrap();

        let messages: Vec<_> = problems.iter().map(|p| p.message.as_str()).collect();
        assert_eq!(messages, vec!["Found 'b'.", "Found 'a'.", "Found 'c'."]);
        assert_eq!(problems[0].line, 1);
        assert_eq!(problems[0].column, 5);
        assert_eq!(problems[0].end_column, Some(6));
        assert_eq!(problems[2].line, 2);
        assert_eq!(problems[2].node_type.as_deref(), Some("Identifier"));
    }

    #[test]
    fn disabled_rules_do_not_run() {
        let problems = linter()
            .verify("a;", &config(&[("report-identifiers", RuleEntry::off())]), "test.js")
            .unwrap();

        assert!(problems.is_empty());
    }

    #[test]
    fn parse_failure_is_single_fatal_problem() {
        let problems = linter()
            .verify(
                "var = ;",
                &config(&[("report-identifiers", RuleEntry::error())]),
                "test.js",
            )
            .unwrap();

        assert_eq!(problems.len(), 1);
        assert!(problems[0].fatal);
        assert!(problems[0].message.starts_with("Parsing error:"));
        assert!(problems[0].rule_id.is_none());
    }

    #[test]
    fn unknown_rule_is_config_error() {
        let result = linter().verify("a;", &config(&[("nope", RuleEntry::error())]), "test.js");

        assert!(matches!(
            result,
            Err(LintError::Config(ConfigError::UnknownRule(name))) if name == "nope"
        ));
    }

    #[test]
    fn invalid_options_are_config_error() {
        let entry = RuleEntry::error().with_options(vec![json!("sometimes")]);
        let result = linter().verify("a;", &config(&[("eqeqeq", entry)]), "test.js");

        assert!(matches!(
            result,
            Err(LintError::Config(ConfigError::InvalidOptions { .. }))
        ));
    }

    #[test]
    fn malformed_selector_is_config_error() {
        let result = linter().verify("a;", &config(&[("bad-selector", RuleEntry::error())]), "test.js");

        assert!(matches!(
            result,
            Err(LintError::Config(ConfigError::InvalidSelector { .. }))
        ));
    }

    #[test]
    fn malformed_selector_wins_over_parse_failure() {
        let linter = linter();
        let enabled = config(&[("bad-selector", RuleEntry::error())]);
        let disabled = config(&[("bad-selector", RuleEntry::off())]);

        assert!(matches!(
            linter.validate_config(&enabled),
            Err(ConfigError::InvalidSelector { rule, .. }) if rule == "bad-selector"
        ));
        assert!(matches!(
            linter.verify("var = ;", &enabled, "test.js"),
            Err(LintError::Config(ConfigError::InvalidSelector { .. }))
        ));
        assert!(linter.validate_config(&disabled).is_ok());
    }

    #[test]
    fn panicking_rule_becomes_runtime_error() {
        let result = linter().verify("\n  foo;", &config(&[("panics", RuleEntry::error())]), "test.js");

        match result {
            Err(LintError::RuleRuntime {
                rule_id,
                line,
                column,
                message,
            }) => {
                assert_eq!(rule_id, "panics");
                assert_eq!((line, column), (2, 3));
                assert_eq!(message, "boom");
            }
            other => panic!("expected a rule runtime error, got {:?}", other),
        }
    }

    #[test]
    fn authoring_faults_become_runtime_errors() {
        let cases = [
            ("fixes-undeclared", "does not declare `fixable`"),
            ("suggests-undeclared", "does not declare `has_suggestions`"),
            ("silent", "neither a message nor a message id"),
        ];

        for (rule, expected) in cases {
            let result = linter().verify("\nfoo;", &config(&[(rule, RuleEntry::error())]), "test.js");
            match result {
                Err(LintError::RuleRuntime {
                    rule_id,
                    line,
                    column,
                    message,
                }) => {
                    assert_eq!(rule_id, rule);
                    assert_eq!((line, column), (2, 1));
                    assert!(message.contains(expected), "{}: {}", rule, message);
                }
                other => panic!("{}: expected a rule runtime error, got {:?}", rule, other),
            }
        }
    }

    #[test]
    fn suggestion_without_edit_is_dropped() {
        let problems = linter()
            .verify("foo;", &config(&[("empty-suggestion", RuleEntry::error())]), "test.js")
            .unwrap();

        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].message, "Found.");
        assert!(problems[0].suggestions.is_empty());
    }

    #[test]
    fn inline_directives_suppress_problems() {
        let source = "// lintel-disable-next-line report-identifiers\na;\nb;";
        let problems = linter()
            .verify(source, &config(&[("report-identifiers", RuleEntry::error())]), "test.js")
            .unwrap();

        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].message, "Found 'b'.");
    }

    #[test]
    fn no_inline_config_ignores_directives() {
        let source = "a; // lintel-disable-line";
        let mut config = config(&[("report-identifiers", RuleEntry::warn())]);
        config.no_inline_config = true;

        let problems = linter().verify(source, &config, "test.js").unwrap();

        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].severity, Severity::Warning);
    }

    #[test]
    fn batch_keeps_input_order_and_isolates_faults() {
        let files = vec![
            SourceFile::new("a.js", "a;"),
            SourceFile::new("b.js", "let = ;"),
            SourceFile::new("c.js", "c; d;"),
        ];
        let config = config(&[("report-identifiers", RuleEntry::error())]);

        let results = linter().verify_batch(&files, &config);

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().len(), 1);
        assert!(results[1].as_ref().unwrap()[0].fatal);
        assert_eq!(results[2].as_ref().unwrap().len(), 2);
    }

    #[test]
    fn verify_and_fix_converges() {
        let config = config(&[("eqeqeq", RuleEntry::error())]);

        let report = linter()
            .verify_and_fix("if (a == 1 && b != 'x') {}", &config, "test.js", &FixOptions::new())
            .unwrap();

        assert_eq!(report.output, "if (a == 1 && b != 'x') {}");
        assert!(!report.fixed);

        let report = linter()
            .verify_and_fix("typeof a == 'string'", &config, "test.js", &FixOptions::new())
            .unwrap();

        assert_eq!(report.output, "typeof a === 'string'");
        assert!(report.fixed);
        assert_eq!(report.passes, 1);
        assert!(report.problems.is_empty());
    }
}
