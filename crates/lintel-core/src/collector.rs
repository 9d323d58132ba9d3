//! Final problem list assembly.

use crate::diagnostic::Problem;
use crate::directives::DisableDirectives;

/// Drops problems suppressed by `directives` and sorts the rest by position.
///
/// Fatal problems and problems without a rule id are never suppressed. Problems at
/// the same position keep their report order.
pub fn finalize(problems: Vec<Problem>, directives: Option<&DisableDirectives>) -> Vec<Problem> {
    let mut kept: Vec<Problem> = problems
        .into_iter()
        .filter(|problem| match (directives, problem.rule_id.as_deref()) {
            (Some(directives), Some(rule_id)) if !problem.fatal => {
                !directives.is_disabled(problem.line, problem.column, rule_id)
            }
            _ => true,
        })
        .collect();
    kept.sort_by_key(|problem| (problem.line, problem.column));
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Severity;
    use crate::directives::DisableDirective;

    fn problem(rule_id: &str, line: usize, column: usize) -> Problem {
        Problem::new(Some(rule_id), Severity::Error, rule_id, line, column)
    }

    #[test]
    fn sorts_by_line_then_column() {
        let problems = vec![problem("a", 2, 1), problem("b", 1, 5), problem("c", 1, 2)];

        let result = finalize(problems, None);

        let order: Vec<_> = result.iter().map(|p| p.message.as_str()).collect();
        assert_eq!(order, vec!["c", "b", "a"]);
    }

    #[test]
    fn ties_keep_report_order() {
        let problems = vec![problem("second-rule", 1, 1), problem("first-rule", 1, 1)];

        let result = finalize(problems, None);

        assert_eq!(result[0].message, "second-rule");
        assert_eq!(result[1].message, "first-rule");
    }

    #[test]
    fn same_location_problems_are_not_deduplicated() {
        let problems = vec![problem("a", 1, 1), problem("a", 1, 1)];

        assert_eq!(finalize(problems, None).len(), 2);
    }

    #[test]
    fn directives_filter_problems() {
        let mut directives = DisableDirectives::new();
        directives.add(DisableDirective::new(1, vec!["a".to_string()]));
        let problems = vec![problem("a", 1, 1), problem("b", 1, 1), problem("a", 2, 1)];

        let result = finalize(problems, Some(&directives));

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].message, "b");
        assert_eq!(result[1].line, 2);
    }

    #[test]
    fn fatal_problems_survive_directives() {
        let mut directives = DisableDirectives::new();
        directives.add(DisableDirective::new(1, Vec::new()));
        let problems = vec![Problem::parse_failure("Unexpected token", 1, 1)];

        assert_eq!(finalize(problems, Some(&directives)).len(), 1);
    }
}
