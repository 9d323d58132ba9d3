//! Rule system.
//!
//! A rule is immutable metadata plus a factory: [`Rule::create`] runs once per lint
//! pass and returns the [`Listeners`] the traversal dispatches to. Rules report through
//! the [`RuleContext`] handed to every listener.

pub mod context;
pub mod correctness;
pub mod helpers;
pub mod listeners;
pub mod quality;

use serde::Serialize;
use serde_json::Value;

pub use context::{Fixer, IntoEdits, Report, RuleContext, Suggest};
pub use listeners::{Listener, Listeners};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleType {
    Problem,
    Suggestion,
    Layout,
}

impl RuleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleType::Problem => "problem",
            RuleType::Suggestion => "suggestion",
            RuleType::Layout => "layout",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Fixable {
    Code,
    Whitespace,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleMeta {
    pub name: &'static str,
    pub rule_type: RuleType,
    pub description: &'static str,
    pub fixable: Option<Fixable>,
    pub has_suggestions: bool,
    /// JSON schema for the options; `None` accepts anything.
    pub schema: Option<Value>,
    pub messages: &'static [(&'static str, &'static str)],
    pub docs_url: Option<&'static str>,
}

impl RuleMeta {
    pub fn message(&self, id: &str) -> Option<&'static str> {
        self.messages
            .iter()
            .find(|(key, _)| *key == id)
            .map(|(_, text)| *text)
    }
}

pub trait Rule: Send + Sync {
    fn meta(&self) -> &RuleMeta;
    fn create<'a>(&'a self, ctx: &RuleContext<'a>) -> Listeners<'a>;
}

/// Rules in registration order, keyed by the id configuration refers to them by.
pub struct RuleRegistry {
    rules: Vec<(String, Box<dyn Rule>)>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Registers `rule` under its metadata name.
    pub fn register(&mut self, rule: Box<dyn Rule>) {
        let name = rule.meta().name.to_string();
        self.register_as(&name, rule);
    }

    /// Registers `rule` under `id`, replacing any rule with that id in place.
    pub fn register_as(&mut self, id: &str, rule: Box<dyn Rule>) {
        match self.rules.iter().position(|(existing, _)| existing == id) {
            Some(index) => self.rules[index].1 = rule,
            None => self.rules.push((id.to_string(), rule)),
        }
    }

    pub fn rules(&self) -> impl Iterator<Item = (&str, &dyn Rule)> {
        self.rules.iter().map(|(id, rule)| (id.as_str(), rule.as_ref()))
    }

    pub fn get(&self, id: &str) -> Option<&dyn Rule> {
        self.rules
            .iter()
            .find(|(existing, _)| existing == id)
            .map(|(_, rule)| rule.as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|(id, _)| id.as_str())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

pub fn default_registry() -> RuleRegistry {
    let mut registry = RuleRegistry::new();
    registry.register(Box::new(quality::Eqeqeq::new()));
    registry.register(Box::new(quality::NoConsole::new()));
    registry.register(Box::new(correctness::NoUndef::new()));
    registry.register(Box::new(correctness::NoMisleadingCharacterClass::new()));
    registry
}

#[macro_export]
macro_rules! declare_rule {
    (
        $name:ident,
        name = $rule_name:literal,
        rule_type = $ty:ident,
        description = $desc:literal,
        messages = [$(($id:literal, $text:literal)),* $(,)?]
        $(, fixable = $fixable:ident)?
        $(, has_suggestions = $suggest:literal)?
        $(, schema = $schema:expr)?
        $(, docs_url = $url:literal)?
        $(,)?
    ) => {
        pub struct $name {
            meta: $crate::rules::RuleMeta,
        }

        impl $name {
            pub fn new() -> Self {
                Self {
                    meta: $crate::rules::RuleMeta {
                        name: $rule_name,
                        rule_type: $crate::rules::RuleType::$ty,
                        description: $desc,
                        fixable: $crate::declare_rule!(@fixable $($fixable)?),
                        has_suggestions: $crate::declare_rule!(@flag $($suggest)?),
                        schema: $crate::declare_rule!(@schema $($schema)?),
                        messages: &[$(($id, $text)),*],
                        docs_url: $crate::declare_rule!(@docs_url $($url)?),
                    },
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
    (@fixable $fixable:ident) => { Some($crate::rules::Fixable::$fixable) };
    (@fixable) => { None };
    (@flag $value:literal) => { $value };
    (@flag) => { false };
    (@schema $schema:expr) => { Some($schema) };
    (@schema) => { None };
    (@docs_url $url:literal) => { Some($url) };
    (@docs_url) => { None };
}

#[cfg(test)]
mod tests {
    use super::*;

    declare_rule!(
        SampleRule,
        name = "sample",
        rule_type = Problem,
        description = "A sample rule",
        messages = [("found", "Found {{ name }}.")],
        fixable = Code,
    );

    impl Rule for SampleRule {
        fn meta(&self) -> &RuleMeta {
            &self.meta
        }

        fn create<'a>(&'a self, _ctx: &RuleContext<'a>) -> Listeners<'a> {
            Listeners::new()
        }
    }

    #[test]
    fn declared_rule_has_metadata() {
        let rule = SampleRule::new();
        let meta = rule.meta();

        assert_eq!(meta.name, "sample");
        assert_eq!(meta.rule_type, RuleType::Problem);
        assert_eq!(meta.fixable, Some(Fixable::Code));
        assert!(!meta.has_suggestions);
        assert!(meta.schema.is_none());
        assert_eq!(meta.message("found"), Some("Found {{ name }}."));
        assert_eq!(meta.message("missing"), None);
    }

    #[test]
    fn registry_keeps_registration_order() {
        let registry = default_registry();
        let names: Vec<_> = registry.names().collect();

        assert_eq!(
            names,
            vec!["eqeqeq", "no-console", "no-undef", "no-misleading-character-class"]
        );
        assert!(registry.get("no-undef").is_some());
        assert!(registry.get("unknown").is_none());
    }

    #[test]
    fn register_replaces_rule_with_same_name() {
        let mut registry = RuleRegistry::new();
        registry.register(Box::new(SampleRule::new()));
        registry.register(Box::new(SampleRule::new()));

        assert_eq!(registry.len(), 1);
        assert!(!registry.is_empty());
    }

    #[test]
    fn register_as_uses_custom_id() {
        let mut registry = RuleRegistry::new();
        registry.register_as("plugin/sample", Box::new(SampleRule::new()));

        assert!(registry.get("plugin/sample").is_some());
        assert!(registry.get("sample").is_none());
        assert_eq!(registry.rules().next().map(|(id, _)| id), Some("plugin/sample"));
    }
}
