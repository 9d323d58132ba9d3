//! Scope graph data: scopes, variables and references.

use std::collections::HashMap;

use id_arena::{Arena, Id};

use crate::ast::{Ast, Node, NodeId};

pub type ScopeId = Id<Scope>;
pub type VariableId = Id<Variable>;
pub type ReferenceId = Id<Reference>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Global,
    Module,
    Function,
    FunctionExpressionName,
    Block,
    For,
    Switch,
    Catch,
    Class,
    ClassFieldInitializer,
    StaticBlock,
    With,
}

impl ScopeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeKind::Global => "global",
            ScopeKind::Module => "module",
            ScopeKind::Function => "function",
            ScopeKind::FunctionExpressionName => "function-expression-name",
            ScopeKind::Block => "block",
            ScopeKind::For => "for",
            ScopeKind::Switch => "switch",
            ScopeKind::Catch => "catch",
            ScopeKind::Class => "class",
            ScopeKind::ClassFieldInitializer => "class-field-initializer",
            ScopeKind::StaticBlock => "class-static-block",
            ScopeKind::With => "with",
        }
    }

    /// Scopes that receive `var` declarations.
    pub fn is_variable_scope(&self) -> bool {
        matches!(
            self,
            ScopeKind::Global
                | ScopeKind::Module
                | ScopeKind::Function
                | ScopeKind::ClassFieldInitializer
                | ScopeKind::StaticBlock
        )
    }
}

#[derive(Debug)]
pub struct Scope {
    pub id: ScopeId,
    pub kind: ScopeKind,
    /// The node that created this scope.
    pub block: NodeId,
    pub upper: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    pub variable_scope: ScopeId,
    pub variables: Vec<VariableId>,
    pub set: HashMap<String, VariableId>,
    pub references: Vec<ReferenceId>,
    pub through: Vec<ReferenceId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionKind {
    Variable,
    FunctionName,
    ClassName,
    Parameter,
    CatchClause,
    ImportBinding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Definition {
    pub kind: DefinitionKind,
    /// The binding identifier.
    pub name: NodeId,
    /// The declaring node (`VariableDeclarator`, `FunctionDeclaration`, ...).
    pub node: NodeId,
    /// `VariableDeclaration` for variable definitions.
    pub parent: Option<NodeId>,
}

#[derive(Debug)]
pub struct Variable {
    pub id: VariableId,
    pub name: String,
    pub scope: ScopeId,
    pub defs: Vec<Definition>,
    pub references: Vec<ReferenceId>,
    /// Set for globals declared by configuration.
    pub writeable: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceFlag {
    Read,
    Write,
    ReadWrite,
}

#[derive(Debug)]
pub struct Reference {
    pub id: ReferenceId,
    pub identifier: NodeId,
    pub from: ScopeId,
    pub resolved: Option<VariableId>,
    pub flag: ReferenceFlag,
    /// Write that initializes a declaration.
    pub init: bool,
    pub write_expr: Option<NodeId>,
}

impl Reference {
    pub fn is_read(&self) -> bool {
        matches!(self.flag, ReferenceFlag::Read | ReferenceFlag::ReadWrite)
    }

    pub fn is_write(&self) -> bool {
        matches!(self.flag, ReferenceFlag::Write | ReferenceFlag::ReadWrite)
    }

    pub fn is_read_only(&self) -> bool {
        self.flag == ReferenceFlag::Read
    }

    pub fn is_write_only(&self) -> bool {
        self.flag == ReferenceFlag::Write
    }
}

/// Immutable scope graph of one parse.
#[derive(Debug)]
pub struct ScopeManager {
    pub(crate) scopes: Arena<Scope>,
    pub(crate) variables: Arena<Variable>,
    pub(crate) references: Arena<Reference>,
    pub(crate) node_scopes: HashMap<NodeId, Vec<ScopeId>>,
    pub(crate) global: ScopeId,
}

impl ScopeManager {
    pub fn global_scope(&self) -> &Scope {
        &self.scopes[self.global]
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id]
    }

    pub fn variable(&self, id: VariableId) -> &Variable {
        &self.variables[id]
    }

    pub fn reference(&self, id: ReferenceId) -> &Reference {
        &self.references[id]
    }

    pub fn scopes(&self) -> impl Iterator<Item = &Scope> {
        self.scopes.iter().map(|(_, scope)| scope)
    }

    pub fn variables_of(&self, scope: ScopeId) -> impl Iterator<Item = &Variable> {
        self.scopes[scope]
            .variables
            .iter()
            .map(move |id| &self.variables[*id])
    }

    pub fn references_of(&self, variable: VariableId) -> impl Iterator<Item = &Reference> {
        self.variables[variable]
            .references
            .iter()
            .map(move |id| &self.references[*id])
    }

    pub fn through(&self, scope: ScopeId) -> impl Iterator<Item = &Reference> {
        self.scopes[scope]
            .through
            .iter()
            .map(move |id| &self.references[*id])
    }

    pub fn upper(&self, scope: ScopeId) -> Option<&Scope> {
        self.scopes[scope].upper.map(|id| &self.scopes[id])
    }

    pub fn ancestors(&self, scope: ScopeId) -> AncestorIter<'_> {
        AncestorIter {
            manager: self,
            current: Some(scope),
        }
    }

    /// Scopes created by `node`; `inner` picks the innermost.
    pub fn acquire(&self, node: NodeId, inner: bool) -> Option<ScopeId> {
        let scopes = self.node_scopes.get(&node)?;
        if scopes.len() == 1 {
            return scopes.first().copied();
        }
        let named = |id: &&ScopeId| self.scopes[**id].kind != ScopeKind::FunctionExpressionName;
        if inner {
            scopes.iter().rev().find(named).copied()
        } else {
            scopes.iter().find(named).copied()
        }
    }

    /// Innermost scope containing `node`. `Program` yields the global scope.
    pub fn scope_for(&self, node: Node<'_>) -> ScopeId {
        let inner = !node.is("Program");
        let mut current = Some(node);
        while let Some(n) = current {
            if let Some(id) = self.acquire(n.id(), inner) {
                let scope = &self.scopes[id];
                if scope.kind == ScopeKind::FunctionExpressionName {
                    if let Some(child) = scope.children.first() {
                        return *child;
                    }
                }
                return id;
            }
            current = n.parent();
        }
        self.global
    }

    /// Looks `name` up from `scope` outwards.
    pub fn find_variable(&self, scope: ScopeId, name: &str) -> Option<&Variable> {
        self.ancestors(scope)
            .find_map(|s| s.set.get(name))
            .map(|id| &self.variables[*id])
    }

    /// Variable a binding identifier declares.
    pub fn declared_by(&self, identifier: NodeId) -> Option<&Variable> {
        self.variables
            .iter()
            .map(|(_, variable)| variable)
            .find(|variable| variable.defs.iter().any(|def| def.name == identifier))
    }

    /// Reference created for `identifier`, if it is one.
    pub fn reference_at(&self, identifier: NodeId) -> Option<&Reference> {
        self.references
            .iter()
            .map(|(_, reference)| reference)
            .find(|reference| reference.identifier == identifier)
    }

    /// Name of a reference's identifier.
    pub fn reference_name<'a>(&self, ast: &'a Ast, reference: &Reference) -> &'a str {
        ast.node(reference.identifier).name().unwrap_or_default()
    }
}

pub struct AncestorIter<'a> {
    manager: &'a ScopeManager,
    current: Option<ScopeId>,
}

impl<'a> Iterator for AncestorIter<'a> {
    type Item = &'a Scope;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current?;
        let scope = &self.manager.scopes[current];
        self.current = scope.upper;
        Some(scope)
    }
}
