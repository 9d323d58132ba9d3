//! Failures gathered while running rule tests.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseKind {
    Valid,
    Invalid,
}

impl fmt::Display for CaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaseKind::Valid => f.write_str("valid"),
            CaseKind::Invalid => f.write_str("invalid"),
        }
    }
}

/// One discrepancy found in one case.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind} case #{index} {}: {message}", label(.name, .code))]
pub struct TesterFailure {
    pub kind: CaseKind,
    /// 0-based position within its list.
    pub index: usize,
    pub code: String,
    pub name: Option<String>,
    pub message: String,
}

fn label(name: &Option<String>, code: &str) -> String {
    match name {
        Some(name) => format!("\"{}\"", name),
        None => format!("{:?}", code),
    }
}

/// Every failure of one run, raised together.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error(
    "{} failure(s) in {cases} case(s) of rule \"{rule}\":\n{}",
    .failures.len(),
    render(.failures)
)]
pub struct TesterReport {
    pub rule: String,
    pub cases: usize,
    pub failures: Vec<TesterFailure>,
}

fn render(failures: &[TesterFailure]) -> String {
    failures
        .iter()
        .map(|failure| format!("  - {}", failure))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_lists_every_failure() {
        let report = TesterReport {
            rule: "no-console".to_string(),
            cases: 3,
            failures: vec![
                TesterFailure {
                    kind: CaseKind::Valid,
                    index: 0,
                    code: "console.log(1)".to_string(),
                    name: None,
                    message: "Should have no errors but had 1".to_string(),
                },
                TesterFailure {
                    kind: CaseKind::Invalid,
                    index: 2,
                    code: "x".to_string(),
                    name: Some("named".to_string()),
                    message: "Output is incorrect".to_string(),
                },
            ],
        };

        assert_eq!(
            report.to_string(),
            "2 failure(s) in 3 case(s) of rule \"no-console\":\n  \
             - valid case #0 \"console.log(1)\": Should have no errors but had 1\n  \
             - invalid case #2 \"named\": Output is incorrect"
        );
    }
}
