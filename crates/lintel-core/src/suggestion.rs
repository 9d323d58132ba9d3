//! Applying suggestions on request.
//!
//! Suggestions never take part in autofix. A caller picks one and applies it to the
//! text the problem was reported against.

use crate::config::LanguageOptions;
use crate::diagnostic::Suggestion;
use crate::parser::{ParseError, parse};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SuggestionError {
    #[error("Suggestion edit {start}..{end} does not fit a source of {len} bytes")]
    InvalidRange { start: usize, end: usize, len: usize },
    #[error("Suggestion produced unparsable code: {0}")]
    Unparsable(#[from] ParseError),
}

pub fn apply_suggestion(source: &str, suggestion: &Suggestion) -> Result<String, SuggestionError> {
    let fix = &suggestion.fix;
    if !fix.is_valid_for(source) {
        return Err(SuggestionError::InvalidRange {
            start: fix.start,
            end: fix.end,
            len: source.len(),
        });
    }
    Ok(fix.apply(source))
}

/// Applies `suggestion` and checks that the result still parses.
pub fn apply_and_validate(
    source: &str,
    suggestion: &Suggestion,
    options: &LanguageOptions,
) -> Result<String, SuggestionError> {
    let output = apply_suggestion(source, suggestion)?;
    parse(&output, options)?;
    Ok(output)
}
