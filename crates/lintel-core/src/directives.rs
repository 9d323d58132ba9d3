//! Inline disable comment directives for suppressing problems
//!
//! Supports:
//! - `// lintel-disable-next-line no-console` - disable a rule for the next line
//! - `// lintel-disable-line no-console` - disable a rule for the comment's line
//! - `/* lintel-disable no-console */` ... `/* lintel-enable no-console */` - disable a region
//! - any of the above without rule names - disable every rule
//!
//! Text after ` -- ` is a free-form reason and is ignored.

use std::collections::{HashMap, HashSet};

use crate::source_code::{CommentKind, Location, SourceCode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisableDirective {
    pub line: usize,
    pub rule_ids: Vec<String>,
}

impl DisableDirective {
    pub fn new(line: usize, rule_ids: Vec<String>) -> Self {
        Self { line, rule_ids }
    }

    pub fn disables_rule(&self, rule_id: &str) -> bool {
        self.rule_ids.is_empty() || self.rule_ids.iter().any(|id| id == rule_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RegionKind {
    Disable,
    Enable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RegionDirective {
    /// Problems at or after this location are affected.
    at: Location,
    kind: RegionKind,
    rule_ids: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DisableDirectives {
    by_line: HashMap<usize, Vec<DisableDirective>>,
    regions: Vec<RegionDirective>,
}

impl DisableDirectives {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_source_code(source_code: &SourceCode) -> Self {
        let mut directives = Self::new();

        for comment in source_code.comments() {
            let text = comment.value.trim();
            let text = text.split(" -- ").next().unwrap_or(text).trim();
            let start = source_code.location(comment.span.start);
            let end = source_code.location(comment.span.end);

            if let Some(rest) = directive_body(text, "lintel-disable-next-line") {
                if comment.kind == CommentKind::Line || start.line == end.line {
                    directives.add(DisableDirective::new(end.line + 1, parse_rule_ids(rest)));
                }
            } else if let Some(rest) = directive_body(text, "lintel-disable-line") {
                if start.line == end.line {
                    directives.add(DisableDirective::new(start.line, parse_rule_ids(rest)));
                }
            } else if comment.kind == CommentKind::Block {
                if let Some(rest) = directive_body(text, "lintel-disable") {
                    directives.regions.push(RegionDirective {
                        at: start,
                        kind: RegionKind::Disable,
                        rule_ids: parse_rule_ids(rest),
                    });
                } else if let Some(rest) = directive_body(text, "lintel-enable") {
                    directives.regions.push(RegionDirective {
                        at: start,
                        kind: RegionKind::Enable,
                        rule_ids: parse_rule_ids(rest),
                    });
                }
            }
        }

        directives
    }

    pub fn add(&mut self, directive: DisableDirective) {
        self.by_line.entry(directive.line).or_default().push(directive);
    }

    /// Whether a problem of `rule_id` reported at `line`/`column` (1-based) is suppressed.
    pub fn is_disabled(&self, line: usize, column: usize, rule_id: &str) -> bool {
        let by_line = self
            .by_line
            .get(&line)
            .is_some_and(|list| list.iter().any(|d| d.disables_rule(rule_id)));
        by_line || self.is_disabled_by_region(line, column, rule_id)
    }

    fn is_disabled_by_region(&self, line: usize, column: usize, rule_id: &str) -> bool {
        let position = Location {
            line,
            column: column.saturating_sub(1),
        };
        let mut all = false;
        let mut exceptions: HashSet<&str> = HashSet::new();
        let mut rules: HashSet<&str> = HashSet::new();

        for region in self.regions.iter().take_while(|r| r.at <= position) {
            match (region.kind, region.rule_ids.is_empty()) {
                (RegionKind::Disable, true) => {
                    all = true;
                    exceptions.clear();
                }
                (RegionKind::Disable, false) => {
                    for id in &region.rule_ids {
                        rules.insert(id);
                        exceptions.remove(id.as_str());
                    }
                }
                (RegionKind::Enable, true) => {
                    all = false;
                    exceptions.clear();
                    rules.clear();
                }
                (RegionKind::Enable, false) => {
                    for id in &region.rule_ids {
                        rules.remove(id.as_str());
                        if all {
                            exceptions.insert(id);
                        }
                    }
                }
            }
        }

        (all && !exceptions.contains(rule_id)) || rules.contains(rule_id)
    }

    pub fn is_empty(&self) -> bool {
        self.by_line.is_empty() && self.regions.is_empty()
    }
}

/// Text after `keyword` when the comment starts with it as a whole word.
fn directive_body<'t>(text: &'t str, keyword: &str) -> Option<&'t str> {
    let rest = text.strip_prefix(keyword)?;
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest)
    } else {
        None
    }
}

fn parse_rule_ids(rest: &str) -> Vec<String> {
    let trimmed = rest.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    trimmed
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
