//! Autofix conflict resolution.
//!
//! One pass collects the `fix` edits of a problem list, keeps a maximal
//! non-overlapping subset in source order and rewrites the text once. The bounded
//! pass loop lives in [`Linter::verify_and_fix`](crate::linter::Linter::verify_and_fix).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

use crate::diagnostic::{Edit, Problem};
use crate::rules::RuleType;

pub const DEFAULT_MAX_PASSES: usize = 10;

#[derive(Debug, Clone)]
pub struct FixOptions {
    pub max_passes: usize,
    /// Checked between passes only.
    pub cancel: Option<Arc<AtomicBool>>,
    /// Rule types whose fixes take part; `None` allows all.
    pub fix_types: Option<Vec<RuleType>>,
}

impl Default for FixOptions {
    fn default() -> Self {
        Self {
            max_passes: DEFAULT_MAX_PASSES,
            cancel: None,
            fix_types: None,
        }
    }
}

impl FixOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }

    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn with_fix_types(mut self, fix_types: Vec<RuleType>) -> Self {
        self.fix_types = Some(fix_types);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    pub fn allows(&self, rule_type: Option<RuleType>) -> bool {
        match (&self.fix_types, rule_type) {
            (None, _) => true,
            (Some(types), Some(rule_type)) => types.contains(&rule_type),
            (Some(_), None) => false,
        }
    }
}

/// Result of a single fix pass.
#[derive(Debug, Clone, PartialEq)]
pub struct FixPass {
    pub output: String,
    pub applied: usize,
    /// Problems whose fix was not applied, in their original order.
    pub remaining: Vec<Problem>,
}

/// Applies every non-conflicting fix among `problems` for which `include` holds.
///
/// Edits are ordered by start, then by end, then by report order. An edit is
/// accepted when it starts at or after the end of the last accepted edit.
pub fn apply_fixes<F>(source: &str, problems: &[Problem], include: F) -> FixPass
where
    F: Fn(&Problem) -> bool,
{
    let mut candidates: Vec<(usize, &Edit)> = problems
        .iter()
        .enumerate()
        .filter(|(_, problem)| include(problem))
        .filter_map(|(index, problem)| problem.fix.as_ref().map(|fix| (index, fix)))
        .filter(|(index, fix)| {
            let valid = fix.is_valid_for(source);
            if !valid {
                warn!(problem = index, start = fix.start, end = fix.end, "skipping invalid fix");
            }
            valid
        })
        .collect();
    candidates.sort_by_key(|(index, fix)| (fix.start, fix.end, *index));

    let mut accepted: Vec<(usize, &Edit)> = Vec::new();
    let mut last_end: Option<usize> = None;
    for (index, fix) in candidates {
        if last_end.is_some_and(|end| fix.start < end) {
            debug!(problem = index, "fix conflicts with an earlier fix");
            continue;
        }
        last_end = Some(fix.end);
        accepted.push((index, fix));
    }

    let mut output = String::with_capacity(source.len());
    let mut cursor = 0;
    for (_, fix) in &accepted {
        output.push_str(&source[cursor..fix.start]);
        output.push_str(&fix.text);
        cursor = fix.end;
    }
    output.push_str(&source[cursor..]);

    let applied: Vec<usize> = accepted.iter().map(|(index, _)| *index).collect();
    let remaining = problems
        .iter()
        .enumerate()
        .filter(|(index, _)| !applied.contains(index))
        .map(|(_, problem)| problem.clone())
        .collect();

    FixPass {
        output,
        applied: applied.len(),
        remaining,
    }
}

/// Folds the edits of one report into a single edit spanning all of them, keeping
/// the original text between them. Returns `None` when edits overlap.
pub(crate) fn merge_edits(source: &str, mut edits: Vec<Edit>) -> Option<Edit> {
    if edits.len() <= 1 {
        return edits.pop();
    }
    edits.sort_by_key(|edit| (edit.start, edit.end));
    if edits.windows(2).any(|pair| pair[1].start < pair[0].end) {
        return None;
    }

    let start = edits[0].start;
    let mut text = String::new();
    let mut cursor = start;
    for edit in &edits {
        text.push_str(source.get(cursor..edit.start)?);
        text.push_str(&edit.text);
        cursor = edit.end;
    }
    Some(Edit::new(start, cursor, text))
}
