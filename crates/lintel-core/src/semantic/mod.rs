//! Scope analysis over the generic AST.

pub mod builder;
pub mod scope;

pub use builder::ScopeBuilder;
pub use scope::{
    AncestorIter, Definition, DefinitionKind, Reference, ReferenceFlag, ReferenceId, Scope,
    ScopeId, ScopeKind, ScopeManager, Variable, VariableId,
};

use crate::ast::Ast;
use crate::config::LanguageOptions;

pub fn analyze(ast: &Ast, options: &LanguageOptions) -> ScopeManager {
    ScopeBuilder::build(ast, options)
}
