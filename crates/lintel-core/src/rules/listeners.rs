//! Listener maps returned by [`Rule::create`](super::Rule::create).

use super::RuleContext;
use crate::ast::Node;

pub type Listener<'a> = Box<dyn FnMut(Node<'a>, &RuleContext<'a>) + 'a>;

/// Selector-keyed callbacks, kept in declaration order, plus whole-file hooks.
#[derive(Default)]
pub struct Listeners<'a> {
    pub(crate) handlers: Vec<(String, Listener<'a>)>,
    pub(crate) on_start: Option<Listener<'a>>,
    pub(crate) on_end: Option<Listener<'a>>,
}

impl<'a> Listeners<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(mut self, selector: &str, listener: F) -> Self
    where
        F: FnMut(Node<'a>, &RuleContext<'a>) + 'a,
    {
        self.handlers.push((selector.to_string(), Box::new(listener)));
        self
    }

    /// Runs once with the root node before the walk.
    pub fn on_start<F>(mut self, listener: F) -> Self
    where
        F: FnMut(Node<'a>, &RuleContext<'a>) + 'a,
    {
        self.on_start = Some(Box::new(listener));
        self
    }

    /// Runs once with the root node after the walk.
    pub fn on_end<F>(mut self, listener: F) -> Self
    where
        F: FnMut(Node<'a>, &RuleContext<'a>) + 'a,
    {
        self.on_end = Some(Box::new(listener));
        self
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty() && self.on_start.is_none() && self.on_end.is_none()
    }
}
