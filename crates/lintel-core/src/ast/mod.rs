//! Generic, ESTree-shaped syntax tree.
//!
//! Nodes live in an arena and are addressed by [`NodeId`]. Every node carries an
//! ESTree type name, a byte range into the source, the name of the parent field it
//! sits in, and a handful of scalar attributes (`name`, `operator`, `value`, ...).
//! Rules and selectors work against this shape instead of the parser's own types.

pub(crate) mod lower;

use std::fmt;

use id_arena::{Arena, Id};
use serde::Serialize;

pub type NodeId = Id<AstNode>;

/// Half-open byte range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Str(String),
    Num(f64),
    Bool(bool),
    Null,
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_num(&self) -> Option<f64> {
        match self {
            AttrValue::Num(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Str(s) => f.write_str(s),
            AttrValue::Num(n) => write!(f, "{}", n),
            AttrValue::Bool(b) => write!(f, "{}", b),
            AttrValue::Null => f.write_str("null"),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Str(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Num(value)
    }
}

#[derive(Debug, Clone)]
pub struct AstNode {
    kind: &'static str,
    span: Span,
    parent: Option<NodeId>,
    field: Option<&'static str>,
    children: Vec<NodeId>,
    attrs: Vec<(&'static str, AttrValue)>,
    index: usize,
}

pub struct Ast {
    arena: Arena<AstNode>,
    root: NodeId,
    len: usize,
}

impl fmt::Debug for Ast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ast")
            .field("root", &self.root().kind())
            .field("node_count", &self.len)
            .finish()
    }
}

impl Ast {
    pub(crate) fn from_parts(mut arena: Arena<AstNode>, root: NodeId) -> Self {
        let ids: Vec<NodeId> = arena.iter().map(|(id, _)| id).collect();
        for id in &ids {
            let mut children = std::mem::take(&mut arena[*id].children);
            children.sort_by_key(|child| arena[*child].span.start);
            for (index, child) in children.iter().enumerate() {
                arena[*child].index = index;
            }
            arena[*id].children = children;
        }
        let len = ids.len();
        Self { arena, root, len }
    }

    pub fn root(&self) -> Node<'_> {
        self.node(self.root)
    }

    pub fn node(&self, id: NodeId) -> Node<'_> {
        Node { ast: self, id }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// All nodes in document (pre-)order.
    pub fn preorder(&self) -> Vec<Node<'_>> {
        let mut out = Vec::with_capacity(self.len);
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            out.push(self.node(id));
            stack.extend(self.arena[id].children.iter().rev());
        }
        out
    }

    /// Innermost node whose span contains `[start, end)`.
    pub fn node_at(&self, start: usize, end: usize) -> Node<'_> {
        let target = Span::new(start, end);
        let mut current = self.root();
        'descend: loop {
            for child in current.children() {
                if child.span().contains(target) {
                    current = child;
                    continue 'descend;
                }
            }
            return current;
        }
    }
}

/// Borrowed handle to one node of an [`Ast`].
#[derive(Clone, Copy)]
pub struct Node<'a> {
    ast: &'a Ast,
    id: NodeId,
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && std::ptr::eq(self.ast, other.ast)
    }
}

impl Eq for Node<'_> {}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}..{}", self.kind(), self.span().start, self.span().end)
    }
}

impl<'a> Node<'a> {
    fn data(&self) -> &'a AstNode {
        &self.ast.arena[self.id]
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn ast(&self) -> &'a Ast {
        self.ast
    }

    pub fn kind(&self) -> &'static str {
        self.data().kind
    }

    pub fn is(&self, kind: &str) -> bool {
        self.data().kind == kind
    }

    pub fn span(&self) -> Span {
        self.data().span
    }

    pub fn start(&self) -> usize {
        self.data().span.start
    }

    pub fn end(&self) -> usize {
        self.data().span.end
    }

    /// Name of the parent field this node occupies, e.g. `callee` or `arguments`.
    pub fn field(&self) -> Option<&'static str> {
        self.data().field
    }

    pub fn parent(&self) -> Option<Node<'a>> {
        self.data().parent.map(|id| self.ast.node(id))
    }

    pub fn ancestors(&self) -> impl Iterator<Item = Node<'a>> + 'a {
        let ast = self.ast;
        std::iter::successors(self.parent(), move |n| n.data().parent.map(|id| ast.node(id)))
    }

    pub fn children(&self) -> impl Iterator<Item = Node<'a>> + 'a {
        let ast = self.ast;
        self.data().children.iter().map(move |id| ast.node(*id))
    }

    pub fn child_count(&self) -> usize {
        self.data().children.len()
    }

    /// First child stored under `field`.
    pub fn child(&self, field: &str) -> Option<Node<'a>> {
        self.children().find(|c| c.field() == Some(field))
    }

    pub fn children_in(&self, field: &'a str) -> impl Iterator<Item = Node<'a>> + 'a {
        self.children().filter(move |c| c.field() == Some(field))
    }

    pub fn index_in_parent(&self) -> usize {
        self.data().index
    }

    pub fn prev_sibling(&self) -> Option<Node<'a>> {
        let parent = self.parent()?;
        let index = self.index_in_parent().checked_sub(1)?;
        parent.data().children.get(index).map(|id| self.ast.node(*id))
    }

    pub fn next_sibling(&self) -> Option<Node<'a>> {
        let parent = self.parent()?;
        parent
            .data()
            .children
            .get(self.index_in_parent() + 1)
            .map(|id| self.ast.node(*id))
    }

    pub fn attr(&self, name: &str) -> Option<&'a AttrValue> {
        self.data()
            .attrs
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }

    /// True if `name` is an attribute or a dotted prefix of one (`regex` for `regex.flags`).
    pub fn has_attr_prefix(&self, name: &str) -> bool {
        self.data().attrs.iter().any(|(key, _)| {
            *key == name
                || key
                    .strip_prefix(name)
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }

    pub fn attrs(&self) -> impl Iterator<Item = (&'static str, &'a AttrValue)> + 'a {
        self.data().attrs.iter().map(|(k, v)| (*k, v))
    }

    pub fn str_attr(&self, name: &str) -> Option<&'a str> {
        self.attr(name).and_then(AttrValue::as_str)
    }

    pub fn bool_attr(&self, name: &str) -> bool {
        self.attr(name).and_then(AttrValue::as_bool).unwrap_or(false)
    }

    /// `name` of an `Identifier`, `PrivateIdentifier` or `JSXIdentifier`.
    pub fn name(&self) -> Option<&'a str> {
        self.str_attr("name")
    }

    pub fn is_identifier(&self, name: &str) -> bool {
        self.is("Identifier") && self.name() == Some(name)
    }

    /// Strips any `ParenthesizedExpression` wrappers.
    pub fn skip_parens(self) -> Node<'a> {
        let mut node = self;
        while node.is("ParenthesizedExpression") {
            match node.child("expression") {
                Some(inner) => node = inner,
                None => break,
            }
        }
        node
    }

    /// Nearest ancestor that is not a `ParenthesizedExpression`, with the wrapper it was reached from.
    pub fn parent_skip_parens(&self) -> Option<(Node<'a>, Node<'a>)> {
        let mut current = *self;
        let mut parent = self.parent()?;
        while parent.is("ParenthesizedExpression") {
            current = parent;
            parent = parent.parent()?;
        }
        Some((parent, current))
    }

    /// Whether this node is a function of any flavour.
    pub fn is_function(&self) -> bool {
        matches!(
            self.kind(),
            "FunctionDeclaration" | "FunctionExpression" | "ArrowFunctionExpression"
        )
    }

    /// String value of a string `Literal`.
    pub fn string_value(&self) -> Option<&'a str> {
        if self.is("Literal") {
            self.str_attr("value")
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::LanguageOptions;
    use crate::parser::parse;

    #[test]
    fn children_are_in_document_order() {
        let file = parse("foo`a${b}c${d}`", &LanguageOptions::default()).unwrap();
        let root = file.ast().root();
        let tpl = file
            .ast()
            .preorder()
            .into_iter()
            .find(|n| n.is("TemplateLiteral"))
            .unwrap();

        let kinds: Vec<_> = tpl.children().map(|c| c.kind()).collect();

        assert_eq!(root.kind(), "Program");
        assert_eq!(
            kinds,
            vec![
                "TemplateElement",
                "Identifier",
                "TemplateElement",
                "Identifier",
                "TemplateElement"
            ]
        );
    }

    #[test]
    fn fields_and_attrs_are_recorded() {
        let file = parse("a.b(1, 'x');", &LanguageOptions::default()).unwrap();
        let call = file
            .ast()
            .preorder()
            .into_iter()
            .find(|n| n.is("CallExpression"))
            .unwrap();

        let callee = call.child("callee").unwrap();
        let args: Vec<_> = call.children_in("arguments").collect();

        assert_eq!(callee.kind(), "MemberExpression");
        assert_eq!(callee.child("property").unwrap().name(), Some("b"));
        assert_eq!(args.len(), 2);
        assert_eq!(args[1].string_value(), Some("x"));
        assert_eq!(args[0].next_sibling(), Some(args[1]));
    }

    #[test]
    fn skip_parens_unwraps_nested_wrappers() {
        let file = parse("f((('x')));", &LanguageOptions::default()).unwrap();
        let arg = file
            .ast()
            .preorder()
            .into_iter()
            .find(|n| n.field() == Some("arguments"))
            .unwrap();

        assert_eq!(arg.kind(), "ParenthesizedExpression");
        assert_eq!(arg.skip_parens().string_value(), Some("x"));
    }

    #[test]
    fn regex_literal_attrs_share_prefix() {
        let file = parse("var r = /[a]/gi;", &LanguageOptions::default()).unwrap();
        let lit = file
            .ast()
            .preorder()
            .into_iter()
            .find(|n| n.is("Literal"))
            .unwrap();

        assert!(lit.has_attr_prefix("regex"));
        assert_eq!(lit.str_attr("regex.pattern"), Some("[a]"));
        assert_eq!(lit.str_attr("regex.flags"), Some("gi"));
    }

    #[test]
    fn node_at_finds_innermost() {
        let source = "let x = foo(bar);";
        let file = parse(source, &LanguageOptions::default()).unwrap();
        let start = source.find("bar").unwrap();

        let node = file.ast().node_at(start, start + 3);

        assert!(node.is_identifier("bar"));
    }
}
