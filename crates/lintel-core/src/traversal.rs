//! Depth-first traversal with selector dispatch.
//!
//! Every node is entered in pre-order and left in post-order. For each node and
//! phase, matching listeners run in rule order, then in declaration order within a rule.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::{trace, warn};

use crate::ast::{Ast, Node};
use crate::config::ConfigError;
use crate::linter::LintError;
use crate::rules::{Listener, Listeners, RuleContext};
use crate::selector::ParsedSelector;

/// One active rule for one pass: its context and parsed listeners.
pub(crate) struct RuleRun<'a> {
    ctx: RuleContext<'a>,
    selectors: Vec<ParsedSelector>,
    handlers: Vec<Listener<'a>>,
    on_start: Option<Listener<'a>>,
    on_end: Option<Listener<'a>>,
}

impl<'a> RuleRun<'a> {
    /// Parses every selector of `listeners` up front.
    pub fn prepare(ctx: RuleContext<'a>, listeners: Listeners<'a>) -> Result<Self, ConfigError> {
        let mut selectors = Vec::with_capacity(listeners.len());
        let mut handlers = Vec::with_capacity(listeners.len());
        for (raw, handler) in listeners.handlers {
            let selector = ParsedSelector::parse(&raw).map_err(|source| {
                ConfigError::InvalidSelector {
                    rule: ctx.id().to_string(),
                    source,
                }
            })?;
            selectors.push(selector);
            handlers.push(handler);
        }

        Ok(Self {
            ctx,
            selectors,
            handlers,
            on_start: listeners.on_start,
            on_end: listeners.on_end,
        })
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Phase {
    Enter,
    Leave,
}

/// Listener positions `(run, handler)` grouped by the node types they can match.
#[derive(Default)]
struct DispatchIndex {
    by_type: HashMap<String, Vec<(usize, usize)>>,
    any: Vec<(usize, usize)>,
}

impl DispatchIndex {
    fn build(runs: &[RuleRun<'_>], phase: Phase) -> Self {
        let mut index = Self::default();
        for (run_index, run) in runs.iter().enumerate() {
            for (handler_index, selector) in run.selectors.iter().enumerate() {
                if selector.is_exit() != (phase == Phase::Leave) {
                    continue;
                }
                let key = (run_index, handler_index);
                match selector.node_types() {
                    Some(types) => {
                        for node_type in types {
                            let entries = index.by_type.entry(node_type.clone()).or_default();
                            if !entries.contains(&key) {
                                entries.push(key);
                            }
                        }
                    }
                    None => index.any.push(key),
                }
            }
        }
        index
    }

    fn candidates(&self, kind: &str) -> Vec<(usize, usize)> {
        let mut candidates = self.any.clone();
        if let Some(typed) = self.by_type.get(kind) {
            candidates.extend_from_slice(typed);
        }
        candidates.sort_unstable();
        candidates
    }

    fn is_empty(&self) -> bool {
        self.by_type.is_empty() && self.any.is_empty()
    }
}

/// Walks `ast` once, dispatching to every run's listeners.
pub(crate) fn traverse<'a>(ast: &'a Ast, runs: &mut [RuleRun<'a>]) -> Result<(), LintError> {
    let root = ast.root();

    for run in runs.iter_mut() {
        if let Some(hook) = run.on_start.as_mut() {
            invoke(&run.ctx, hook, root, "on_start")?;
        }
    }

    let enter = DispatchIndex::build(runs, Phase::Enter);
    let leave = DispatchIndex::build(runs, Phase::Leave);

    if !enter.is_empty() || !leave.is_empty() {
        let mut stack: Vec<(Node<'a>, bool)> = vec![(root, false)];
        while let Some((node, visited)) = stack.pop() {
            if visited {
                dispatch(&leave, runs, node)?;
                continue;
            }
            dispatch(&enter, runs, node)?;
            stack.push((node, true));
            let children: Vec<Node<'a>> = node.children().collect();
            stack.extend(children.into_iter().rev().map(|child| (child, false)));
        }
    }

    for run in runs.iter_mut() {
        if let Some(hook) = run.on_end.as_mut() {
            invoke(&run.ctx, hook, root, "on_end")?;
        }
    }

    Ok(())
}

fn dispatch<'a>(
    index: &DispatchIndex,
    runs: &mut [RuleRun<'a>],
    node: Node<'a>,
) -> Result<(), LintError> {
    for (run_index, handler_index) in index.candidates(node.kind()) {
        let RuleRun {
            ctx,
            selectors,
            handlers,
            ..
        } = &mut runs[run_index];
        let selector = &selectors[handler_index];
        if !selector.matches(node) {
            continue;
        }
        trace!(
            rule = ctx.id(),
            selector = selector.raw(),
            node = node.kind(),
            start = node.start(),
            "dispatch"
        );
        invoke(ctx, &mut handlers[handler_index], node, selector.raw())?;
    }
    Ok(())
}

fn invoke<'a>(
    ctx: &RuleContext<'a>,
    handler: &mut Listener<'a>,
    node: Node<'a>,
    label: &str,
) -> Result<(), LintError> {
    ctx.set_current(node);
    let fault = match catch_unwind(AssertUnwindSafe(|| handler(node, ctx))) {
        Ok(()) => ctx.take_fault(),
        Err(payload) => Some(panic_message(payload.as_ref())),
    };

    match fault {
        None => Ok(()),
        Some(message) => {
            let location = ctx.source_code().location(node.start());
            warn!(
                rule = ctx.id(),
                listener = label,
                line = location.line,
                "rule failed: {}",
                message
            );
            Err(LintError::RuleRuntime {
                rule_id: ctx.id().to_string(),
                line: location.line,
                column: location.column + 1,
                message,
            })
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "rule panicked".to_string()
    }
}
