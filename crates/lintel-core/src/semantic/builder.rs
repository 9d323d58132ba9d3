//! Builds the [`ScopeManager`] from the generic AST.
//!
//! References are queued in the scope where they occur and resolved when that scope
//! closes, so hoisted declarations resolve regardless of source order. Unresolved
//! references move to the enclosing scope and are recorded in `through` on the way.

use std::collections::HashMap;

use id_arena::Arena;

use super::scope::{
    Definition, DefinitionKind, Reference, ReferenceFlag, ReferenceId, Scope, ScopeId, ScopeKind,
    ScopeManager, Variable, VariableId,
};
use crate::ast::{Ast, Node, NodeId};
use crate::config::{GlobalAccess, LanguageOptions, SourceType};

pub struct ScopeBuilder<'a> {
    ast: &'a Ast,
    es6: bool,
    scopes: Arena<Scope>,
    variables: Arena<Variable>,
    references: Arena<Reference>,
    node_scopes: HashMap<NodeId, Vec<ScopeId>>,
    stack: Vec<(ScopeId, Vec<ReferenceId>)>,
}

impl<'a> ScopeBuilder<'a> {
    pub fn build(ast: &'a Ast, options: &LanguageOptions) -> ScopeManager {
        let mut builder = Self {
            ast,
            es6: options.ecma_version >= 2015,
            scopes: Arena::new(),
            variables: Arena::new(),
            references: Arena::new(),
            node_scopes: HashMap::new(),
            stack: Vec::new(),
        };

        let root = ast.root();
        let global = builder.open(ScopeKind::Global, root);
        for (name, access) in &options.globals {
            if *access == GlobalAccess::Off {
                continue;
            }
            let variable = builder.variable_in(global, name);
            builder.variables[variable].writeable = Some(*access == GlobalAccess::Writable);
        }

        let wrapper = match options.source_type {
            SourceType::Module => Some(ScopeKind::Module),
            SourceType::Commonjs => Some(ScopeKind::Function),
            SourceType::Script => None,
        };
        if let Some(kind) = wrapper {
            let scope = builder.open(kind, root);
            if kind == ScopeKind::Function {
                builder.variable_in(scope, "arguments");
            }
        }

        builder.visit_children(root);

        if wrapper.is_some() {
            builder.close();
        }
        builder.close();

        ScopeManager {
            scopes: builder.scopes,
            variables: builder.variables,
            references: builder.references,
            node_scopes: builder.node_scopes,
            global,
        }
    }

    fn current(&self) -> ScopeId {
        self.stack
            .last()
            .map(|(id, _)| *id)
            .unwrap_or_else(|| unreachable!("scope stack is never empty while visiting"))
    }

    fn open(&mut self, kind: ScopeKind, block: Node<'a>) -> ScopeId {
        let upper = self.stack.last().map(|(id, _)| *id);
        let id = self.scopes.alloc_with_id(|id| Scope {
            id,
            kind,
            block: block.id(),
            upper,
            children: Vec::new(),
            variable_scope: id,
            variables: Vec::new(),
            set: HashMap::new(),
            references: Vec::new(),
            through: Vec::new(),
        });

        if let Some(upper) = upper {
            self.scopes[upper].children.push(id);
            if !kind.is_variable_scope() {
                self.scopes[id].variable_scope = self.scopes[upper].variable_scope;
            }
        }
        self.node_scopes.entry(block.id()).or_default().push(id);
        self.stack.push((id, Vec::new()));
        id
    }

    fn close(&mut self) {
        let Some((id, pending)) = self.stack.pop() else {
            return;
        };

        for reference in pending {
            let name = self
                .ast
                .node(self.references[reference].identifier)
                .name()
                .unwrap_or_default();
            let resolved = self.scopes[id]
                .set
                .get(name)
                .copied()
                .filter(|variable| self.is_valid_resolution(id, reference, *variable));

            match resolved {
                Some(variable) => {
                    self.references[reference].resolved = Some(variable);
                    self.variables[variable].references.push(reference);
                }
                None => {
                    self.scopes[id].through.push(reference);
                    if let Some((_, upper_pending)) = self.stack.last_mut() {
                        upper_pending.push(reference);
                    }
                }
            }
        }
    }

    /// Parameter defaults cannot see declarations from the function body.
    fn is_valid_resolution(&self, scope: ScopeId, reference: ReferenceId, variable: VariableId) -> bool {
        let scope_data = &self.scopes[scope];
        if scope_data.kind != ScopeKind::Function {
            return true;
        }
        let block = self.ast.node(scope_data.block);
        let Some(body) = block.child("body").filter(|_| block.is_function()) else {
            return true;
        };
        let body_start = body.start();
        let identifier = self.ast.node(self.references[reference].identifier);
        let variable = &self.variables[variable];

        !(variable.scope == scope
            && identifier.start() < body_start
            && variable
                .defs
                .iter()
                .all(|def| self.ast.node(def.name).start() >= body_start))
    }

    fn variable_in(&mut self, scope: ScopeId, name: &str) -> VariableId {
        if let Some(existing) = self.scopes[scope].set.get(name) {
            return *existing;
        }
        let id = self.variables.alloc_with_id(|id| Variable {
            id,
            name: name.to_string(),
            scope,
            defs: Vec::new(),
            references: Vec::new(),
            writeable: None,
        });
        let scope = &mut self.scopes[scope];
        scope.variables.push(id);
        scope.set.insert(name.to_string(), id);
        id
    }

    fn declare(
        &mut self,
        scope: ScopeId,
        name: Node<'a>,
        kind: DefinitionKind,
        node: Node<'a>,
        parent: Option<Node<'a>>,
    ) {
        let Some(text) = name.name() else {
            return;
        };
        let variable = self.variable_in(scope, text);
        self.variables[variable].defs.push(Definition {
            kind,
            name: name.id(),
            node: node.id(),
            parent: parent.map(|p| p.id()),
        });
    }

    fn reference(
        &mut self,
        identifier: Node<'a>,
        flag: ReferenceFlag,
        write_expr: Option<Node<'a>>,
        init: bool,
    ) {
        let from = self.current();
        let id = self.references.alloc_with_id(|id| Reference {
            id,
            identifier: identifier.id(),
            from,
            resolved: None,
            flag,
            init,
            write_expr: write_expr.map(|n| n.id()),
        });
        self.scopes[from].references.push(id);
        if let Some((_, pending)) = self.stack.last_mut() {
            pending.push(id);
        }
    }

    fn visit_children(&mut self, node: Node<'a>) {
        for child in node.children() {
            self.visit(child);
        }
    }

    fn visit_field(&mut self, node: Node<'a>, field: &str) {
        if let Some(child) = node.child(field) {
            self.visit(child);
        }
    }

    fn visit(&mut self, node: Node<'a>) {
        match node.kind() {
            "Identifier" => self.reference(node, ReferenceFlag::Read, None, false),
            "FunctionDeclaration" => {
                if let Some(id) = node.child("id") {
                    let scope = self.current();
                    self.declare(scope, id, DefinitionKind::FunctionName, node, None);
                }
                self.visit_function(node);
            }
            "FunctionExpression" | "ArrowFunctionExpression" => self.visit_function(node),
            "ClassDeclaration" => {
                if let Some(id) = node.child("id") {
                    let scope = self.current();
                    self.declare(scope, id, DefinitionKind::ClassName, node, None);
                }
                self.visit_class(node);
            }
            "ClassExpression" => self.visit_class(node),
            "VariableDeclaration" => self.visit_variable_declaration(node, false),
            "BlockStatement" => {
                if self.es6 {
                    self.open(ScopeKind::Block, node);
                    self.visit_children(node);
                    self.close();
                } else {
                    self.visit_children(node);
                }
            }
            "StaticBlock" => {
                self.open(ScopeKind::StaticBlock, node);
                self.visit_children(node);
                self.close();
            }
            "SwitchStatement" => {
                self.visit_field(node, "discriminant");
                if self.es6 {
                    self.open(ScopeKind::Switch, node);
                }
                for case in node.children_in("cases") {
                    self.visit(case);
                }
                if self.es6 {
                    self.close();
                }
            }
            "ForStatement" => {
                let scoped = self.es6 && node.child("init").is_some_and(is_lexical_declaration);
                if scoped {
                    self.open(ScopeKind::For, node);
                }
                self.visit_children(node);
                if scoped {
                    self.close();
                }
            }
            "ForInStatement" | "ForOfStatement" => self.visit_for_in(node),
            "CatchClause" => {
                let scope = self.open(ScopeKind::Catch, node);
                if let Some(param) = node.child("param") {
                    let (names, deferred) = collect_pattern(param);
                    for name in names {
                        self.declare(scope, name, DefinitionKind::CatchClause, node, None);
                    }
                    for n in deferred {
                        self.visit(n);
                    }
                }
                self.visit_field(node, "body");
                self.close();
            }
            "WithStatement" => {
                self.visit_field(node, "object");
                self.open(ScopeKind::With, node);
                self.visit_field(node, "body");
                self.close();
            }
            "AssignmentExpression" => self.visit_assignment(node),
            "UpdateExpression" => match node.child("argument").map(Node::skip_parens) {
                Some(argument) if argument.is("Identifier") => {
                    self.reference(argument, ReferenceFlag::ReadWrite, None, false)
                }
                _ => self.visit_children(node),
            },
            "MemberExpression" => {
                self.visit_field(node, "object");
                if node.bool_attr("computed") {
                    self.visit_field(node, "property");
                }
            }
            "Property" | "MethodDefinition" => {
                if node.bool_attr("computed") {
                    self.visit_field(node, "key");
                }
                self.visit_field(node, "value");
            }
            "PropertyDefinition" => {
                if node.bool_attr("computed") {
                    self.visit_field(node, "key");
                }
                if let Some(value) = node.child("value") {
                    self.open(ScopeKind::ClassFieldInitializer, value);
                    self.visit(value);
                    self.close();
                }
            }
            "LabeledStatement" => self.visit_field(node, "body"),
            "BreakStatement" | "ContinueStatement" | "MetaProperty" | "ExportAllDeclaration" => {}
            "ImportDeclaration" => {
                let scope = self.current();
                for specifier in node.children_in("specifiers") {
                    if let Some(local) = specifier.child("local") {
                        self.declare(scope, local, DefinitionKind::ImportBinding, specifier, Some(node));
                    }
                }
            }
            "ExportNamedDeclaration" => {
                if let Some(declaration) = node.child("declaration") {
                    self.visit(declaration);
                } else if node.child("source").is_none() {
                    for specifier in node.children_in("specifiers") {
                        if let Some(local) = specifier.child("local").filter(|l| l.is("Identifier")) {
                            self.reference(local, ReferenceFlag::Read, None, false);
                        }
                    }
                }
            }
            _ => self.visit_children(node),
        }
    }

    fn visit_function(&mut self, node: Node<'a>) {
        let named_expression = node.is("FunctionExpression") && node.child("id").is_some();
        if named_expression {
            let scope = self.open(ScopeKind::FunctionExpressionName, node);
            if let Some(id) = node.child("id") {
                self.declare(scope, id, DefinitionKind::FunctionName, node, None);
            }
        }

        let scope = self.open(ScopeKind::Function, node);
        if !node.is("ArrowFunctionExpression") {
            self.variable_in(scope, "arguments");
        }

        let mut deferred = Vec::new();
        for param in node.children_in("params") {
            let (names, rest) = collect_pattern(param);
            for name in names {
                self.declare(scope, name, DefinitionKind::Parameter, node, None);
            }
            deferred.extend(rest);
        }
        for n in deferred {
            self.visit(n);
        }

        if let Some(body) = node.child("body") {
            if body.is("BlockStatement") {
                self.visit_children(body);
            } else {
                self.visit(body);
            }
        }

        self.close();
        if named_expression {
            self.close();
        }
    }

    fn visit_class(&mut self, node: Node<'a>) {
        for decorator in node.children_in("decorators") {
            self.visit(decorator);
        }
        let scope = self.open(ScopeKind::Class, node);
        if let Some(id) = node.child("id") {
            self.declare(scope, id, DefinitionKind::ClassName, node, None);
        }
        self.visit_field(node, "superClass");
        if let Some(body) = node.child("body") {
            self.visit_children(body);
        }
        self.close();
    }

    /// Declares every binding of `declaration`. With `for_in_head`, each binding also
    /// gets an initializing write from the loop's right-hand side.
    fn visit_variable_declaration(&mut self, declaration: Node<'a>, for_in_head: bool) {
        let kind = declaration.str_attr("kind").unwrap_or("var");
        let target = if kind == "var" {
            self.scopes[self.current()].variable_scope
        } else {
            self.current()
        };
        let loop_right = declaration
            .parent()
            .filter(|_| for_in_head)
            .and_then(|parent| parent.child("right"));

        for declarator in declaration.children_in("declarations") {
            let Some(id) = declarator.child("id") else {
                continue;
            };
            let init = declarator.child("init");
            let (names, deferred) = collect_pattern(id);
            for name in names {
                self.declare(target, name, DefinitionKind::Variable, declarator, Some(declaration));
                if let Some(write) = init.or(loop_right) {
                    self.reference(name, ReferenceFlag::Write, Some(write), true);
                }
            }
            for n in deferred {
                self.visit(n);
            }
            if let Some(init) = init {
                self.visit(init);
            }
        }
    }

    fn visit_for_in(&mut self, node: Node<'a>) {
        let left = node.child("left");
        let scoped = self.es6 && left.is_some_and(is_lexical_declaration);
        if scoped {
            self.open(ScopeKind::For, node);
        }

        let right = node.child("right");
        if let Some(left) = left {
            if left.is("VariableDeclaration") {
                self.visit_variable_declaration(left, true);
            } else {
                self.visit_assignment_target(left.skip_parens(), ReferenceFlag::Write, right);
            }
        }
        if let Some(right) = right {
            self.visit(right);
        }
        self.visit_field(node, "body");

        if scoped {
            self.close();
        }
    }

    fn visit_assignment(&mut self, node: Node<'a>) {
        let flag = match node.str_attr("operator") {
            Some("=") | None => ReferenceFlag::Write,
            Some(_) => ReferenceFlag::ReadWrite,
        };
        let right = node.child("right");
        if let Some(left) = node.child("left") {
            self.visit_assignment_target(left.skip_parens(), flag, right);
        }
        if let Some(right) = right {
            self.visit(right);
        }
    }

    fn visit_assignment_target(
        &mut self,
        target: Node<'a>,
        flag: ReferenceFlag,
        write_expr: Option<Node<'a>>,
    ) {
        if !matches!(target.kind(), "Identifier" | "ObjectPattern" | "ArrayPattern") {
            self.visit(target);
            return;
        }
        let (names, deferred) = collect_pattern(target);
        for name in names {
            self.reference(name, flag, write_expr, false);
        }
        for n in deferred {
            self.visit(n);
        }
    }
}

fn is_lexical_declaration(node: Node<'_>) -> bool {
    node.is("VariableDeclaration") && node.str_attr("kind") != Some("var")
}

/// Splits a pattern into its binding identifiers and the expressions inside it
/// (defaults, computed keys, member targets) that are visited as ordinary code.
fn collect_pattern<'a>(pattern: Node<'a>) -> (Vec<Node<'a>>, Vec<Node<'a>>) {
    let mut names = Vec::new();
    let mut deferred = Vec::new();
    let mut stack = vec![pattern];

    while let Some(node) = stack.pop() {
        match node.kind() {
            "Identifier" => names.push(node),
            "ObjectPattern" => {
                for property in node.children().collect::<Vec<_>>().into_iter().rev() {
                    match property.kind() {
                        "Property" => {
                            if let Some(value) = property.child("value") {
                                stack.push(value);
                            }
                            if property.bool_attr("computed") {
                                if let Some(key) = property.child("key") {
                                    deferred.push(key);
                                }
                            }
                        }
                        _ => stack.push(property),
                    }
                }
            }
            "ArrayPattern" => {
                let elements: Vec<_> = node.children().collect();
                stack.extend(elements.into_iter().rev());
            }
            "RestElement" => {
                if let Some(argument) = node.child("argument") {
                    stack.push(argument);
                }
            }
            "AssignmentPattern" => {
                if let Some(right) = node.child("right") {
                    deferred.push(right);
                }
                if let Some(left) = node.child("left") {
                    stack.push(left);
                }
            }
            "ParenthesizedExpression" => stack.push(node.skip_parens()),
            _ => deferred.push(node),
        }
    }

    (names, deferred)
}

#[cfg(test)]
mod tests {
    use crate::config::{LanguageOptions, SourceType};
    use crate::parser::parse;
    use crate::semantic::{ScopeKind, ScopeManager, analyze};

    fn build(source: &str, options: &LanguageOptions) -> (crate::parser::ParsedFile, LanguageOptions) {
        (parse(source, options).unwrap(), options.clone())
    }

    fn script(ecma_version: u32) -> LanguageOptions {
        LanguageOptions {
            ecma_version,
            source_type: SourceType::Script,
            ..LanguageOptions::default()
        }
    }

    fn kinds(manager: &ScopeManager) -> Vec<&'static str> {
        manager.scopes().map(|s| s.kind.as_str()).collect()
    }

    #[test]
    fn module_scope_sits_under_global() {
        let (file, options) = build("let a = 1;", &LanguageOptions::default());
        let manager = analyze(file.ast(), &options);

        assert_eq!(kinds(&manager), vec!["global", "module"]);
        let module = manager.global_scope().children[0];
        assert!(manager.variables_of(module).any(|v| v.name == "a"));
        assert!(manager.variables_of(manager.global_scope().id).all(|v| v.name != "a"));
    }

    #[test]
    fn configured_globals_have_no_definitions() {
        let (file, options) = build("RegExp('a');", &script(2015));
        let manager = analyze(file.ast(), &options);

        let regexp = manager
            .find_variable(manager.global_scope().id, "RegExp")
            .unwrap();
        assert!(regexp.defs.is_empty());
        assert_eq!(regexp.references.len(), 1);
        assert_eq!(regexp.writeable, Some(false));
    }

    #[test]
    fn var_hoists_to_function_scope_and_let_stays_in_block() {
        let (file, options) = build("function f() { { var a; let b; } }", &script(2015));
        let manager = analyze(file.ast(), &options);

        let function = manager
            .scopes()
            .find(|s| s.kind == ScopeKind::Function)
            .unwrap();
        let block = manager
            .scopes()
            .find(|s| s.kind == ScopeKind::Block)
            .unwrap();

        let function_vars: Vec<_> = manager.variables_of(function.id).map(|v| v.name.as_str()).collect();
        let block_vars: Vec<_> = manager.variables_of(block.id).map(|v| v.name.as_str()).collect();
        assert_eq!(function_vars, vec!["arguments", "a"]);
        assert_eq!(block_vars, vec!["b"]);
    }

    #[test]
    fn es5_has_no_block_scopes() {
        let (file, options) = build("if (x) { var a; }", &script(5));
        let manager = analyze(file.ast(), &options);

        assert_eq!(kinds(&manager), vec!["global"]);
    }

    #[test]
    fn hoisted_references_resolve() {
        let (file, options) = build("f(); function f() {}", &script(2015));
        let manager = analyze(file.ast(), &options);

        let f = manager.find_variable(manager.global_scope().id, "f").unwrap();
        assert_eq!(f.references.len(), 1);
        assert_eq!(manager.global_scope().through.len(), 0);
    }

    #[test]
    fn unresolved_references_pass_through() {
        let (file, options) = build("function f() { return missing + 1; }", &script(2015));
        let manager = analyze(file.ast(), &options);

        let through: Vec<_> = manager
            .through(manager.global_scope().id)
            .map(|r| manager.reference_name(file.ast(), r))
            .collect();
        assert_eq!(through, vec!["missing"]);
    }

    #[test]
    fn property_keys_and_labels_are_not_references() {
        let (file, options) = build(
            "var o = { key: value, [computed]: 1 }; o.prop; label: for (;;) { break label; }",
            &script(2015),
        );
        let manager = analyze(file.ast(), &options);

        let mut names: Vec<_> = manager
            .through(manager.global_scope().id)
            .map(|r| manager.reference_name(file.ast(), r))
            .collect();
        names.sort();
        assert_eq!(names, vec!["computed", "value"]);
    }

    #[test]
    fn write_flags_follow_assignment_kind() {
        let (file, options) = build("var a = 1; a += 2; a++; [a] = b;", &script(2015));
        let manager = analyze(file.ast(), &options);

        let a = manager.find_variable(manager.global_scope().id, "a").unwrap();
        let flags: Vec<_> = manager
            .references_of(a.id)
            .map(|r| (r.is_read(), r.is_write(), r.init))
            .collect();
        assert_eq!(
            flags,
            vec![
                (false, true, true),
                (true, true, false),
                (true, true, false),
                (false, true, false)
            ]
        );
    }

    #[test]
    fn named_function_expression_gets_its_own_scope() {
        let (file, options) = build("var g = function inner() { inner(); };", &script(2015));
        let manager = analyze(file.ast(), &options);

        assert_eq!(
            kinds(&manager),
            vec!["global", "function-expression-name", "function"]
        );
        let call = file
            .ast()
            .preorder()
            .into_iter()
            .find(|n| n.is_identifier("inner") && n.field() == Some("callee"))
            .unwrap();
        let scope = manager.scope_for(call);
        assert_eq!(manager.scope(scope).kind, ScopeKind::Function);
        assert!(manager.find_variable(scope, "inner").is_some());
    }

    #[test]
    fn scope_for_program_is_global_even_in_modules() {
        let (file, options) = build("let a;", &LanguageOptions::default());
        let manager = analyze(file.ast(), &options);

        let root = file.ast().root();
        assert_eq!(manager.scope(manager.scope_for(root)).kind, ScopeKind::Global);

        let declaration = root.children().next().unwrap();
        assert_eq!(
            manager.scope(manager.scope_for(declaration)).kind,
            ScopeKind::Module
        );
    }
}
