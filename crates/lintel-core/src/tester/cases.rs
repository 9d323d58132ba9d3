//! Test case descriptions accepted by the rule testers.
//!
//! Cases can be built in Rust or deserialized from the usual JSON shape
//! (`{ "valid": [...], "invalid": [...] }`); a valid case may be a bare string.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::config::globals::GlobalValue;
use crate::config::{FlatLanguageOptions, ParserOptions};

/// Everything a case can configure besides its code and expectations.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CaseConfig {
    pub options: Vec<Value>,
    pub settings: Map<String, Value>,
    pub filename: Option<String>,
    pub parser_options: Option<ParserOptions>,
    pub env: Option<BTreeMap<String, bool>>,
    pub globals: Option<BTreeMap<String, GlobalValue>>,
    pub language_options: Option<FlatLanguageOptions>,
}

impl CaseConfig {
    /// Names of the legacy-only fields this case sets.
    pub(crate) fn legacy_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.parser_options.is_some() {
            fields.push("parserOptions");
        }
        if self.env.is_some() {
            fields.push("env");
        }
        if self.globals.is_some() {
            fields.push("globals");
        }
        fields
    }
}

macro_rules! case_config_builders {
    ($ty:ty) => {
        impl $ty {
            pub fn name(mut self, name: &str) -> Self {
                self.name = Some(name.to_string());
                self
            }

            pub fn options(mut self, options: Vec<Value>) -> Self {
                self.config.options = options;
                self
            }

            pub fn filename(mut self, filename: &str) -> Self {
                self.config.filename = Some(filename.to_string());
                self
            }

            pub fn setting(mut self, key: &str, value: Value) -> Self {
                self.config.settings.insert(key.to_string(), value);
                self
            }

            pub fn parser_options(mut self, parser_options: ParserOptions) -> Self {
                self.config.parser_options = Some(parser_options);
                self
            }

            pub fn env(mut self, name: &str) -> Self {
                self.config
                    .env
                    .get_or_insert_with(BTreeMap::new)
                    .insert(name.to_string(), true);
                self
            }

            pub fn global(mut self, name: &str, value: GlobalValue) -> Self {
                self.config
                    .globals
                    .get_or_insert_with(BTreeMap::new)
                    .insert(name.to_string(), value);
                self
            }

            pub fn language_options(mut self, language_options: FlatLanguageOptions) -> Self {
                self.config.language_options = Some(language_options);
                self
            }
        }
    };
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidCase {
    pub code: String,
    pub name: Option<String>,
    pub config: CaseConfig,
}

impl ValidCase {
    pub fn new(code: &str) -> Self {
        Self {
            code: code.to_string(),
            ..Self::default()
        }
    }
}

case_config_builders!(ValidCase);

impl From<&str> for ValidCase {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidCaseFields {
    code: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(flatten)]
    config: CaseConfig,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ValidCaseRepr {
    Code(String),
    Full(ValidCaseFields),
}

impl<'de> Deserialize<'de> for ValidCase {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match ValidCaseRepr::deserialize(deserializer)? {
            ValidCaseRepr::Code(code) => ValidCase::new(&code),
            ValidCaseRepr::Full(fields) => ValidCase {
                code: fields.code,
                name: fields.name,
                config: fields.config,
            },
        })
    }
}

/// Expected errors: an exact list, or only how many.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Errors {
    Count(usize),
    List(Vec<ExpectedError>),
}

impl Default for Errors {
    fn default() -> Self {
        Errors::List(Vec::new())
    }
}

impl Errors {
    pub fn len(&self) -> usize {
        match self {
            Errors::Count(count) => *count,
            Errors::List(errors) => errors.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidCase {
    pub code: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub config: CaseConfig,
    #[serde(default)]
    pub errors: Errors,
    /// Expected text after one fix pass. `None` asserts that nothing is fixed.
    #[serde(default)]
    pub output: Option<String>,
}

impl InvalidCase {
    pub fn new(code: &str) -> Self {
        Self {
            code: code.to_string(),
            ..Self::default()
        }
    }

    pub fn errors(mut self, errors: Vec<ExpectedError>) -> Self {
        self.errors = Errors::List(errors);
        self
    }

    pub fn error_count(mut self, count: usize) -> Self {
        self.errors = Errors::Count(count);
        self
    }

    pub fn output(mut self, output: &str) -> Self {
        self.output = Some(output.to_string());
        self
    }
}

case_config_builders!(InvalidCase);

/// What to check about the suggestions of one problem.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SuggestionsExpectation {
    #[default]
    Unchecked,
    None,
    Exactly(Vec<ExpectedSuggestion>),
}

fn deserialize_suggestions<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<SuggestionsExpectation, D::Error> {
    Ok(match Option::<Vec<ExpectedSuggestion>>::deserialize(deserializer)? {
        None => SuggestionsExpectation::None,
        Some(list) if list.is_empty() => SuggestionsExpectation::None,
        Some(list) => SuggestionsExpectation::Exactly(list),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExpectedError {
    pub message: Option<String>,
    pub message_id: Option<String>,
    pub data: Option<BTreeMap<String, Value>>,
    #[serde(rename = "type")]
    pub node_type: Option<String>,
    pub line: Option<usize>,
    pub column: Option<usize>,
    pub end_line: Option<usize>,
    pub end_column: Option<usize>,
    #[serde(deserialize_with = "deserialize_suggestions")]
    pub suggestions: SuggestionsExpectation,
}

impl ExpectedError {
    pub fn message(message: &str) -> Self {
        Self {
            message: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn message_id(message_id: &str) -> Self {
        Self {
            message_id: Some(message_id.to_string()),
            ..Self::default()
        }
    }

    pub fn data(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.data
            .get_or_insert_with(BTreeMap::new)
            .insert(key.to_string(), value.into());
        self
    }

    pub fn node_type(mut self, node_type: &str) -> Self {
        self.node_type = Some(node_type.to_string());
        self
    }

    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    pub fn end_at(mut self, end_line: usize, end_column: usize) -> Self {
        self.end_line = Some(end_line);
        self.end_column = Some(end_column);
        self
    }

    pub fn suggestions(mut self, suggestions: Vec<ExpectedSuggestion>) -> Self {
        self.suggestions = if suggestions.is_empty() {
            SuggestionsExpectation::None
        } else {
            SuggestionsExpectation::Exactly(suggestions)
        };
        self
    }

    pub fn no_suggestions(mut self) -> Self {
        self.suggestions = SuggestionsExpectation::None;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExpectedSuggestion {
    pub message_id: Option<String>,
    pub desc: Option<String>,
    pub data: Option<BTreeMap<String, Value>>,
    pub output: String,
}

impl ExpectedSuggestion {
    pub fn message_id(message_id: &str, output: &str) -> Self {
        Self {
            message_id: Some(message_id.to_string()),
            output: output.to_string(),
            ..Self::default()
        }
    }

    pub fn desc(desc: &str, output: &str) -> Self {
        Self {
            desc: Some(desc.to_string()),
            output: output.to_string(),
            ..Self::default()
        }
    }

    pub fn data(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.data
            .get_or_insert_with(BTreeMap::new)
            .insert(key.to_string(), value.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Tests {
    pub valid: Vec<ValidCase>,
    pub invalid: Vec<InvalidCase>,
}

impl Tests {
    pub fn new(valid: Vec<ValidCase>, invalid: Vec<InvalidCase>) -> Self {
        Self { valid, invalid }
    }

    pub fn from_json(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

/// Placeholder values as strings; JSON strings lose their quotes.
pub(crate) fn data_pairs(data: &BTreeMap<String, Value>) -> Vec<(String, String)> {
    data.iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            (key.clone(), text)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn valid_cases_accept_bare_strings() {
        let tests = Tests::from_json(json!({
            "valid": ["var a;", { "code": "var b;", "options": [1] }],
            "invalid": []
        }))
        .unwrap();

        assert_eq!(tests.valid[0], ValidCase::new("var a;"));
        assert_eq!(tests.valid[1].config.options, vec![json!(1)]);
    }

    #[test]
    fn errors_accept_count_or_list() {
        let tests = Tests::from_json(json!({
            "invalid": [
                { "code": "a", "errors": 2 },
                { "code": "b", "errors": [{ "messageId": "x", "type": "Literal", "line": 1 }] }
            ]
        }))
        .unwrap();

        assert_eq!(tests.invalid[0].errors, Errors::Count(2));
        assert_eq!(
            tests.invalid[1].errors,
            Errors::List(vec![ExpectedError {
                line: Some(1),
                ..ExpectedError::message_id("x").node_type("Literal")
            }])
        );
    }

    #[test]
    fn suggestions_distinguish_absent_from_none() {
        let tests = Tests::from_json(json!({
            "invalid": [{
                "code": "a",
                "errors": [
                    { "messageId": "x" },
                    { "messageId": "x", "suggestions": null },
                    { "messageId": "x", "suggestions": [{ "messageId": "y", "output": "b" }] }
                ]
            }]
        }))
        .unwrap();

        let Errors::List(errors) = &tests.invalid[0].errors else {
            panic!("expected a list");
        };
        assert_eq!(errors[0].suggestions, SuggestionsExpectation::Unchecked);
        assert_eq!(errors[1].suggestions, SuggestionsExpectation::None);
        assert_eq!(
            errors[2].suggestions,
            SuggestionsExpectation::Exactly(vec![ExpectedSuggestion::message_id("y", "b")])
        );
    }

    #[test]
    fn surface_fields_are_kept_apart() {
        let case: InvalidCase = serde_json::from_value(json!({
            "code": "a",
            "env": { "es6": true },
            "parserOptions": { "ecmaVersion": 6 }
        }))
        .unwrap();

        assert_eq!(case.config.legacy_fields(), vec!["parserOptions", "env"]);
        assert!(case.config.language_options.is_none());
    }

    #[test]
    fn data_values_are_stringified() {
        let error = ExpectedError::message_id("x").data("name", "a").data("count", 2);

        assert_eq!(
            data_pairs(error.data.as_ref().unwrap()),
            vec![
                ("count".to_string(), "2".to_string()),
                ("name".to_string(), "a".to_string())
            ]
        );
    }
}
