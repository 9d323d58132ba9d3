//! Legacy configuration surface (`parserOptions`, `env`, `globals`).

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

use super::flat::EcmaFeatures;
use super::globals::{self, GlobalAccess, GlobalValue};
use super::{ConfigError, EcmaVersionValue, LanguageOptions, LintConfig, RuleEntry, SourceType};

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ParserOptions {
    pub ecma_version: Option<EcmaVersionValue>,
    pub source_type: Option<SourceType>,
    pub ecma_features: EcmaFeatures,
}

impl ParserOptions {
    pub fn ecma_version(mut self, version: u32) -> Self {
        self.ecma_version = Some(EcmaVersionValue::Number(version));
        self
    }

    pub fn source_type(mut self, source_type: SourceType) -> Self {
        self.source_type = Some(source_type);
        self
    }

    fn merge(&self, other: &ParserOptions) -> ParserOptions {
        ParserOptions {
            ecma_version: other
                .ecma_version
                .clone()
                .or_else(|| self.ecma_version.clone()),
            source_type: other.source_type.or(self.source_type),
            ecma_features: EcmaFeatures {
                jsx: self.ecma_features.jsx || other.ecma_features.jsx,
            },
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct LegacyConfig {
    pub parser_options: ParserOptions,
    pub env: BTreeMap<String, bool>,
    pub globals: BTreeMap<String, GlobalValue>,
    pub rules: BTreeMap<String, RuleEntry>,
    pub settings: serde_json::Map<String, Value>,
    pub no_inline_config: bool,
}

impl LegacyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parser_options(mut self, parser_options: ParserOptions) -> Self {
        self.parser_options = parser_options;
        self
    }

    pub fn with_env(mut self, name: &str, enabled: bool) -> Self {
        self.env.insert(name.to_string(), enabled);
        self
    }

    pub fn with_global(mut self, name: &str, value: GlobalValue) -> Self {
        self.globals.insert(name.to_string(), value);
        self
    }

    pub fn with_rule(mut self, name: &str, entry: RuleEntry) -> Self {
        self.rules.insert(name.to_string(), entry);
        self
    }

    /// Fields set in `other` win; maps are merged key by key.
    pub fn merge(&self, other: &LegacyConfig) -> LegacyConfig {
        let mut env = self.env.clone();
        env.extend(other.env.clone());
        let mut globals = self.globals.clone();
        globals.extend(other.globals.clone());
        let mut rules = self.rules.clone();
        rules.extend(other.rules.clone());
        let mut settings = self.settings.clone();
        settings.extend(other.settings.clone());

        LegacyConfig {
            parser_options: self.parser_options.merge(&other.parser_options),
            env,
            globals,
            rules,
            settings,
            no_inline_config: self.no_inline_config || other.no_inline_config,
        }
    }

    pub fn to_lint_config(&self) -> Result<LintConfig, ConfigError> {
        let mut implied_version = None;
        let mut builtin_version = 5;
        let mut resolved: BTreeMap<String, GlobalAccess> = BTreeMap::new();

        for (name, enabled) in &self.env {
            if !enabled {
                continue;
            }
            let env = globals::environment(name)
                .ok_or_else(|| ConfigError::UnknownEnvironment(name.clone()))?;
            if let Some(version) = env.builtins {
                builtin_version = builtin_version.max(version);
            }
            if let Some(version) = env.ecma_version {
                implied_version = Some(implied_version.map_or(version, |v: u32| v.max(version)));
            }
            for global in env.globals {
                resolved.insert(global.to_string(), GlobalAccess::Readonly);
            }
        }

        for name in globals::builtin_globals(builtin_version) {
            resolved
                .entry(name.to_string())
                .or_insert(GlobalAccess::Readonly);
        }
        for (name, value) in &self.globals {
            resolved.insert(name.clone(), value.resolve(name)?);
        }

        let ecma_version = match &self.parser_options.ecma_version {
            Some(value) => value.resolve()?,
            None => implied_version.unwrap_or(5),
        };

        Ok(LintConfig {
            language_options: LanguageOptions {
                ecma_version,
                source_type: self.parser_options.source_type.unwrap_or(SourceType::Script),
                globals: resolved,
                jsx: self.parser_options.ecma_features.jsx,
                typescript: false,
            },
            rules: self.rules.clone(),
            settings: self.settings.clone(),
            no_inline_config: self.no_inline_config,
        })
    }
}
