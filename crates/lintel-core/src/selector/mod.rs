//! Listener selectors.
//!
//! A subset of esquery: node types, attribute tests, structural pseudo-classes and the
//! four combinators. Selectors are parsed once when a rule's listeners are prepared;
//! a selector ending in `:exit` runs when the traversal leaves the node.

mod parser;

use regex::Regex;

use crate::ast::{AttrValue, Node};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Invalid selector '{selector}' at position {position}: {message}")]
pub struct SelectorError {
    pub selector: String,
    pub position: usize,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrOp {
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
}

#[derive(Debug, Clone)]
pub enum AttrValueMatcher {
    String(String),
    Number(f64),
    Regex(Regex),
}

#[derive(Debug, Clone)]
pub enum Selector {
    Wildcard,
    Type(String),
    Attribute {
        path: Vec<String>,
        test: Option<(AttrOp, AttrValueMatcher)>,
    },
    Compound(Vec<Selector>),
    Not(Vec<Selector>),
    Matches(Vec<Selector>),
    Has(Vec<Selector>),
    NthChild(usize),
    NthLastChild(usize),
    Descendant(Box<Selector>, Box<Selector>),
    Child(Box<Selector>, Box<Selector>),
    Sibling(Box<Selector>, Box<Selector>),
    Adjacent(Box<Selector>, Box<Selector>),
}

/// A listener key after parsing.
#[derive(Debug, Clone)]
pub struct ParsedSelector {
    raw: String,
    selector: Selector,
    exit: bool,
    node_types: Option<Vec<String>>,
}

impl ParsedSelector {
    pub fn parse(raw: &str) -> Result<Self, SelectorError> {
        let trimmed = raw.trim();
        let (body, exit) = match trimmed.strip_suffix(":exit") {
            Some(body) => (body, true),
            None => (trimmed, false),
        };
        let selector = parser::SelectorParser::new(body).parse()?;
        let node_types = selector.node_types();
        Ok(Self {
            raw: raw.to_string(),
            selector,
            exit,
            node_types,
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn is_exit(&self) -> bool {
        self.exit
    }

    /// Node types this selector can match, or `None` when any type may match.
    pub fn node_types(&self) -> Option<&[String]> {
        self.node_types.as_deref()
    }

    pub fn matches(&self, node: Node<'_>) -> bool {
        self.selector.matches(node)
    }
}

impl Selector {
    pub fn matches(&self, node: Node<'_>) -> bool {
        match self {
            Selector::Wildcard => true,
            Selector::Type(name) => node.kind() == name,
            Selector::Attribute { path, test } => match resolve_path(node, path) {
                None => false,
                Some(value) => match test {
                    None => true,
                    Some((op, expected)) => compare(&value, *op, expected),
                },
            },
            Selector::Compound(parts) => parts.iter().all(|s| s.matches(node)),
            Selector::Not(selectors) => !selectors.iter().any(|s| s.matches(node)),
            Selector::Matches(selectors) => selectors.iter().any(|s| s.matches(node)),
            Selector::Has(selectors) => {
                let mut stack: Vec<Node<'_>> = node.children().collect();
                while let Some(current) = stack.pop() {
                    if selectors.iter().any(|s| s.matches(current)) {
                        return true;
                    }
                    stack.extend(current.children());
                }
                false
            }
            Selector::NthChild(n) => {
                n.checked_sub(1)
                    .and_then(|index| list_siblings(node).get(index).copied())
                    == Some(node)
            }
            Selector::NthLastChild(n) => {
                let siblings = list_siblings(node);
                siblings
                    .len()
                    .checked_sub(*n)
                    .and_then(|index| siblings.get(index))
                    == Some(&node)
            }
            Selector::Descendant(ancestor, inner) => {
                inner.matches(node) && node.ancestors().any(|a| ancestor.matches(a))
            }
            Selector::Child(parent, inner) => {
                inner.matches(node) && node.parent().is_some_and(|p| parent.matches(p))
            }
            Selector::Sibling(before, inner) => {
                inner.matches(node)
                    && list_siblings(node)
                        .into_iter()
                        .take_while(|s| *s != node)
                        .any(|s| before.matches(s))
            }
            Selector::Adjacent(before, inner) => {
                if !inner.matches(node) {
                    return false;
                }
                let siblings = list_siblings(node);
                let index = siblings.iter().position(|s| *s == node);
                index
                    .and_then(|i| i.checked_sub(1))
                    .and_then(|i| siblings.get(i))
                    .is_some_and(|s| before.matches(*s))
            }
        }
    }

    /// Node types the rightmost compound selector is limited to.
    fn node_types(&self) -> Option<Vec<String>> {
        match self {
            Selector::Type(name) => Some(vec![name.clone()]),
            Selector::Compound(parts) => parts.iter().find_map(Selector::node_types),
            Selector::Matches(selectors) => {
                let mut types = Vec::new();
                for selector in selectors {
                    types.extend(selector.node_types()?);
                }
                Some(types)
            }
            Selector::Descendant(_, inner)
            | Selector::Child(_, inner)
            | Selector::Sibling(_, inner)
            | Selector::Adjacent(_, inner) => inner.node_types(),
            _ => None,
        }
    }
}

/// Value found at the end of an attribute path.
enum Resolved<'a> {
    Attr(&'a AttrValue),
    Type(&'static str),
    Node,
}

fn resolve_path<'a>(node: Node<'a>, path: &[String]) -> Option<Resolved<'a>> {
    let mut current = node;
    for (index, segment) in path.iter().enumerate() {
        let dotted = path[index..].join(".");
        if let Some(value) = current.attr(&dotted) {
            return Some(Resolved::Attr(value));
        }
        if let Some(child) = current.child(segment) {
            current = child;
            continue;
        }
        if index + 1 == path.len() && segment == "type" {
            return Some(Resolved::Type(current.kind()));
        }
        if current.has_attr_prefix(&dotted) {
            return Some(Resolved::Node);
        }
        return None;
    }
    Some(Resolved::Node)
}

fn compare(value: &Resolved<'_>, op: AttrOp, expected: &AttrValueMatcher) -> bool {
    let text = match value {
        Resolved::Attr(attr) => Some(attr.to_string()),
        Resolved::Type(kind) => Some(kind.to_string()),
        Resolved::Node => None,
    };

    match (op, expected) {
        (AttrOp::Eq | AttrOp::NotEq, AttrValueMatcher::String(s)) => {
            (text.as_deref() == Some(s.as_str())) == (op == AttrOp::Eq)
        }
        (AttrOp::Eq | AttrOp::NotEq, AttrValueMatcher::Regex(re)) => {
            text.is_some_and(|t| re.is_match(&t)) == (op == AttrOp::Eq)
        }
        (_, AttrValueMatcher::Number(n)) => {
            let Resolved::Attr(AttrValue::Num(actual)) = value else {
                return op == AttrOp::NotEq;
            };
            match op {
                AttrOp::Eq => actual == n,
                AttrOp::NotEq => actual != n,
                AttrOp::Lt => actual < n,
                AttrOp::Lte => actual <= n,
                AttrOp::Gt => actual > n,
                AttrOp::Gte => actual >= n,
            }
        }
        _ => false,
    }
}

/// Nodes sharing this node's parent list field, in order. Empty outside lists.
fn list_siblings(node: Node<'_>) -> Vec<Node<'_>> {
    match (node.parent(), node.field()) {
        (Some(parent), Some(field)) if is_list_field(parent.kind(), field) => {
            parent.children_in(field).collect()
        }
        _ => Vec::new(),
    }
}

fn is_list_field(parent: &str, field: &str) -> bool {
    match field {
        "arguments" | "params" | "elements" | "properties" | "declarations" | "expressions"
        | "quasis" | "cases" | "specifiers" | "decorators" | "children" | "attributes" => true,
        "body" => matches!(parent, "Program" | "BlockStatement" | "ClassBody" | "StaticBlock"),
        "consequent" => parent == "SwitchCase",
        _ => false,
    }
}
