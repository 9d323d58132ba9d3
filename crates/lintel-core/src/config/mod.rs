//! Configuration loading and resolution.
//!
//! Two user-facing surfaces, [`LegacyConfig`] (`parserOptions` / `env` / `globals`) and
//! [`FlatConfig`] (`languageOptions`), both resolve into the immutable [`LintConfig`]
//! the linter consumes. `lintel.toml` files use the flat shape.

pub mod flat;
pub mod globals;
pub mod legacy;
pub mod schema;

use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::diagnostic::Severity;
use crate::selector::SelectorError;

pub use flat::{FlatConfig, FlatLanguageOptions};
pub use globals::GlobalAccess;
pub use legacy::{LegacyConfig, ParserOptions};

pub const CONFIG_FILENAME: &str = "lintel.toml";
pub const LATEST_ECMA_VERSION: u32 = 2025;

const KNOWN_TOP_LEVEL_KEYS: &[&str] = &["languageOptions", "linterOptions", "rules", "settings"];
const KNOWN_LANGUAGE_KEYS: &[&str] = &["ecmaVersion", "sourceType", "globals", "parserOptions"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid TOML in '{path}': {message}")]
    ParseError { path: PathBuf, message: String },
    #[error("Invalid ecmaVersion: {0}")]
    InvalidEcmaVersion(String),
    #[error("Invalid value for global '{name}': {value}")]
    InvalidGlobal { name: String, value: String },
    #[error("Environment key \"{0}\" is unknown")]
    UnknownEnvironment(String),
    #[error("Definition for rule '{0}' was not found")]
    UnknownRule(String),
    #[error("Configuration for rule \"{rule}\" is invalid:\n{message}")]
    InvalidOptions { rule: String, message: String },
    #[error("Rule \"{rule}\" registered an invalid selector: {source}")]
    InvalidSelector {
        rule: String,
        #[source]
        source: SelectorError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Script,
    #[default]
    Module,
    Commonjs,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Script => "script",
            SourceType::Module => "module",
            SourceType::Commonjs => "commonjs",
        }
    }
}

/// `ecmaVersion` as written by the user: a number or `"latest"`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum EcmaVersionValue {
    Number(u32),
    Name(String),
}

impl EcmaVersionValue {
    /// Normalizes to a four-digit year (or 3 / 5).
    pub fn resolve(&self) -> Result<u32, ConfigError> {
        match self {
            EcmaVersionValue::Number(n) => normalize_ecma_version(*n),
            EcmaVersionValue::Name(name) if name == "latest" => Ok(LATEST_ECMA_VERSION),
            EcmaVersionValue::Name(name) => Err(ConfigError::InvalidEcmaVersion(name.clone())),
        }
    }
}

pub fn normalize_ecma_version(version: u32) -> Result<u32, ConfigError> {
    match version {
        3 | 5 => Ok(version),
        6..=16 => Ok(version + 2009),
        2015..=LATEST_ECMA_VERSION => Ok(version),
        _ => Err(ConfigError::InvalidEcmaVersion(version.to_string())),
    }
}

/// Fully resolved language options for one file.
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageOptions {
    pub ecma_version: u32,
    pub source_type: SourceType,
    pub globals: BTreeMap<String, GlobalAccess>,
    pub jsx: bool,
    pub typescript: bool,
}

impl Default for LanguageOptions {
    fn default() -> Self {
        Self {
            ecma_version: LATEST_ECMA_VERSION,
            source_type: SourceType::Module,
            globals: globals::builtin_globals(LATEST_ECMA_VERSION)
                .map(|name| (name.to_string(), GlobalAccess::Readonly))
                .collect(),
            jsx: false,
            typescript: false,
        }
    }
}

/// Severity as configured: `"off"`/`0`, `"warn"`/`1`, `"error"`/`2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleSeverity {
    Off,
    Warn,
    Error,
}

impl RuleSeverity {
    pub fn to_severity(self) -> Option<Severity> {
        match self {
            RuleSeverity::Off => None,
            RuleSeverity::Warn => Some(Severity::Warning),
            RuleSeverity::Error => Some(Severity::Error),
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => match n.as_u64()? {
                0 => Some(RuleSeverity::Off),
                1 => Some(RuleSeverity::Warn),
                2 => Some(RuleSeverity::Error),
                _ => None,
            },
            Value::String(s) => match s.to_lowercase().as_str() {
                "off" => Some(RuleSeverity::Off),
                "warn" => Some(RuleSeverity::Warn),
                "error" => Some(RuleSeverity::Error),
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for RuleSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RuleSeverity::Off => "off",
            RuleSeverity::Warn => "warn",
            RuleSeverity::Error => "error",
        };
        f.write_str(name)
    }
}

/// One entry of a `rules` table: a severity, optionally followed by options.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleEntry {
    pub severity: RuleSeverity,
    pub options: Vec<Value>,
}

impl RuleEntry {
    pub fn new(severity: RuleSeverity) -> Self {
        Self {
            severity,
            options: Vec::new(),
        }
    }

    pub fn error() -> Self {
        Self::new(RuleSeverity::Error)
    }

    pub fn warn() -> Self {
        Self::new(RuleSeverity::Warn)
    }

    pub fn off() -> Self {
        Self::new(RuleSeverity::Off)
    }

    pub fn with_options(mut self, options: Vec<Value>) -> Self {
        self.options = options;
        self
    }
}

impl<'de> Deserialize<'de> for RuleEntry {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let (head, options) = match &value {
            Value::Array(items) if !items.is_empty() => (&items[0], items[1..].to_vec()),
            other => (other, Vec::new()),
        };
        let severity = RuleSeverity::from_value(head).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "Severity should be one of the following: 0 = off, 1 = warn, 2 = error (you passed '{}')",
                head
            ))
        })?;
        Ok(Self { severity, options })
    }
}

/// Immutable configuration for one lint run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LintConfig {
    pub language_options: LanguageOptions,
    pub rules: BTreeMap<String, RuleEntry>,
    pub settings: serde_json::Map<String, Value>,
    pub no_inline_config: bool,
}

impl LintConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, name: &str, entry: RuleEntry) -> Self {
        self.rules.insert(name.to_string(), entry);
        self
    }

    pub fn with_language_options(mut self, language_options: LanguageOptions) -> Self {
        self.language_options = language_options;
        self
    }

    pub fn rule(&self, name: &str) -> Option<&RuleEntry> {
        self.rules.get(name)
    }

    pub fn is_rule_enabled(&self, name: &str) -> bool {
        self.rules
            .get(name)
            .is_some_and(|entry| entry.severity != RuleSeverity::Off)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigResult {
    pub config: FlatConfig,
    pub warnings: Vec<String>,
}

pub fn load_config(path: &Path) -> Result<FlatConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e.message().to_string(),
    })
}

pub fn load_config_with_warnings(path: &Path) -> Result<ConfigResult, ConfigError> {
    let config = load_config(path)?;
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let warnings = detect_unknown_keys(&content);

    Ok(ConfigResult { config, warnings })
}

fn detect_unknown_keys(content: &str) -> Vec<String> {
    let mut warnings = Vec::new();

    let table: toml::Table = match content.parse() {
        Ok(t) => t,
        Err(_) => return warnings,
    };

    let known_top: HashSet<&str> = KNOWN_TOP_LEVEL_KEYS.iter().copied().collect();
    for key in table.keys() {
        if !known_top.contains(key.as_str()) {
            warnings.push(format!("Unknown config option: '{}'", key));
        }
    }

    if let Some(toml::Value::Table(language)) = table.get("languageOptions") {
        let known: HashSet<&str> = KNOWN_LANGUAGE_KEYS.iter().copied().collect();
        for key in language.keys() {
            if !known.contains(key.as_str()) {
                warnings.push(format!(
                    "Unknown config option in [languageOptions]: '{}'",
                    key
                ));
            }
        }
    }

    warnings
}
