//! Lintel: a rule engine for JavaScript.
//!
//! Source is parsed with SWC into a generic ESTree-shaped [`ast::Ast`], scopes are
//! analyzed, and every enabled rule's selector listeners run in one traversal. The
//! [`Linter`] collects problems, honours inline directives and can apply fixes in a
//! bounded loop. [`tester`] checks rules against valid and invalid cases.

pub mod ast;
pub mod collector;
pub mod config;
pub mod diagnostic;
pub mod directives;
pub mod fix;
pub mod linter;
pub mod parser;
pub mod regexp;
pub mod rules;
pub mod selector;
pub mod semantic;
pub mod source_code;
pub mod suggestion;
pub mod tester;
mod traversal;

pub use config::{ConfigError, FlatConfig, LegacyConfig, LintConfig, RuleEntry, load_config};
pub use diagnostic::{Edit, Problem, Severity, Suggestion};
pub use fix::FixOptions;
pub use linter::{FixReport, LintError, Linter, SourceFile};
pub use rules::{Rule, RuleMeta, RuleRegistry, RuleType, default_registry};
pub use tester::{FlatRuleTester, RuleTester};
