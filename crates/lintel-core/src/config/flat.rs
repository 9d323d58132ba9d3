//! Flat configuration surface (`languageOptions`).

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

use super::globals::{self, GlobalAccess, GlobalValue};
use super::{ConfigError, EcmaVersionValue, LanguageOptions, LintConfig, RuleEntry, SourceType};

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct EcmaFeatures {
    pub jsx: bool,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct FlatParserOptions {
    pub ecma_features: EcmaFeatures,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct FlatLanguageOptions {
    pub ecma_version: Option<EcmaVersionValue>,
    pub source_type: Option<SourceType>,
    pub globals: BTreeMap<String, GlobalValue>,
    pub parser_options: FlatParserOptions,
}

impl FlatLanguageOptions {
    pub fn ecma_version(mut self, version: u32) -> Self {
        self.ecma_version = Some(EcmaVersionValue::Number(version));
        self
    }

    pub fn source_type(mut self, source_type: SourceType) -> Self {
        self.source_type = Some(source_type);
        self
    }

    pub fn global(mut self, name: &str, value: GlobalValue) -> Self {
        self.globals.insert(name.to_string(), value);
        self
    }

    /// Fields set in `other` win; globals are merged.
    pub fn merge(&self, other: &FlatLanguageOptions) -> FlatLanguageOptions {
        let mut globals = self.globals.clone();
        globals.extend(other.globals.clone());
        FlatLanguageOptions {
            ecma_version: other
                .ecma_version
                .clone()
                .or_else(|| self.ecma_version.clone()),
            source_type: other.source_type.or(self.source_type),
            globals,
            parser_options: FlatParserOptions {
                ecma_features: EcmaFeatures {
                    jsx: self.parser_options.ecma_features.jsx
                        || other.parser_options.ecma_features.jsx,
                },
            },
        }
    }

    pub fn resolve(&self) -> Result<LanguageOptions, ConfigError> {
        let ecma_version = match &self.ecma_version {
            Some(value) => value.resolve()?,
            None => super::LATEST_ECMA_VERSION,
        };

        let mut resolved: BTreeMap<String, GlobalAccess> = globals::builtin_globals(ecma_version)
            .map(|name| (name.to_string(), GlobalAccess::Readonly))
            .collect();
        for (name, value) in &self.globals {
            resolved.insert(name.clone(), value.resolve(name)?);
        }

        Ok(LanguageOptions {
            ecma_version,
            source_type: self.source_type.unwrap_or(SourceType::Module),
            globals: resolved,
            jsx: self.parser_options.ecma_features.jsx,
            typescript: false,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct LinterOptions {
    pub no_inline_config: bool,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct FlatConfig {
    pub language_options: FlatLanguageOptions,
    pub linter_options: LinterOptions,
    pub rules: BTreeMap<String, RuleEntry>,
    pub settings: serde_json::Map<String, Value>,
}

impl FlatConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_language_options(mut self, language_options: FlatLanguageOptions) -> Self {
        self.language_options = language_options;
        self
    }

    pub fn with_rule(mut self, name: &str, entry: RuleEntry) -> Self {
        self.rules.insert(name.to_string(), entry);
        self
    }

    pub fn merge(&self, other: &FlatConfig) -> FlatConfig {
        let mut rules = self.rules.clone();
        rules.extend(other.rules.clone());
        let mut settings = self.settings.clone();
        settings.extend(other.settings.clone());
        FlatConfig {
            language_options: self.language_options.merge(&other.language_options),
            linter_options: LinterOptions {
                no_inline_config: self.linter_options.no_inline_config
                    || other.linter_options.no_inline_config,
            },
            rules,
            settings,
        }
    }

    pub fn to_lint_config(&self) -> Result<LintConfig, ConfigError> {
        Ok(LintConfig {
            language_options: self.language_options.resolve()?,
            rules: self.rules.clone(),
            settings: self.settings.clone(),
            no_inline_config: self.linter_options.no_inline_config,
        })
    }
}
