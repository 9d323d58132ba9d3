//! Lowers swc's AST into the generic arena tree.
//!
//! Node types with an ESTree counterpart get an explicit override that records the
//! node, its attributes and its fields. Everything else is visited transparently, so
//! its modelled descendants attach to the nearest modelled ancestor. Type-level
//! TypeScript syntax is dropped.

use id_arena::Arena;
use swc_common::{BytePos, Span as SwcSpan, Spanned};
use swc_ecma_ast::{
    ArrayLit, ArrayPat, ArrowExpr, AssignExpr, AssignPat, AssignPatProp, AssignProp, AwaitExpr,
    BigInt, BinExpr, BinaryOp, BindingIdent, BlockStmt, BlockStmtOrExpr, Bool, BreakStmt,
    CallExpr, Callee, CatchClause, Class, ClassDecl, ClassExpr, ClassMember, ClassMethod,
    ClassProp, CondExpr, Constructor, ContinueStmt, DebuggerStmt, Decorator, DefaultDecl,
    DoWhileStmt, EmptyStmt, ExportAll, ExportDecl, ExportDefaultDecl, ExportDefaultExpr,
    ExportDefaultSpecifier, ExportNamedSpecifier, ExportNamespaceSpecifier, Expr, ExprOrSpread,
    ExprStmt, FnDecl, FnExpr, ForInStmt, ForOfStmt, ForStmt, Function, GetterProp, Ident,
    IdentName, IfStmt, ImportDecl, ImportDefaultSpecifier, ImportNamedSpecifier,
    ImportStarAsSpecifier, JSXAttrName, JSXElementName, KeyValuePatProp, KeyValueProp,
    LabeledStmt, MemberExpr, MemberProp, MetaPropExpr, MethodKind, MethodProp, NamedExport,
    NewExpr, Null, Number, ObjectLit, ObjectPat, OptCall, OptChainBase, OptChainExpr,
    ParamOrTsParamProp, ParenExpr, PrivateMethod, PrivateName, PrivateProp, Program, Prop,
    PropName, Regex, RestPat, ReturnStmt, SeqExpr, SetterProp, SpreadElement, StaticBlock, Str,
    Super, SuperProp, SuperPropExpr, SwitchCase, SwitchStmt, TaggedTpl, ThisExpr, ThrowStmt,
    Tpl, TplElement, TryStmt, TsEnumDecl, TsInterfaceDecl, TsModuleDecl, TsParamPropParam,
    TsType, TsTypeAliasDecl, TsTypeAnn, TsTypeParamDecl, TsTypeParamInstantiation, UnaryExpr,
    UpdateExpr, UsingDecl, VarDecl, VarDeclKind, VarDeclarator, WhileStmt, WithStmt, YieldExpr,
};
use swc_ecma_visit::{Visit, VisitWith};

use super::{Ast, AstNode, AttrValue, NodeId, Span};

pub(crate) fn lower_program(program: &Program, source: &str, base: BytePos) -> Ast {
    let mut lowerer = Lowerer::new(source, base);
    let root = lowerer.open_span("Program", Span::new(0, source.len()));

    match program {
        Program::Module(module) => {
            lowerer.attr("sourceType", "module");
            for item in &module.body {
                lowerer.field("body", item);
            }
        }
        Program::Script(script) => {
            lowerer.attr("sourceType", "script");
            for stmt in &script.body {
                lowerer.field("body", stmt);
            }
        }
    }

    lowerer.close();
    Ast::from_parts(lowerer.arena, root)
}

struct Lowerer<'s> {
    source: &'s str,
    base: u32,
    arena: Arena<AstNode>,
    stack: Vec<NodeId>,
    pending_field: Option<&'static str>,
}

impl<'s> Lowerer<'s> {
    fn new(source: &'s str, base: BytePos) -> Self {
        Self {
            source,
            base: base.0,
            arena: Arena::new(),
            stack: Vec::new(),
            pending_field: None,
        }
    }

    fn offset(&self, pos: BytePos) -> usize {
        (pos.0.saturating_sub(self.base) as usize).min(self.source.len())
    }

    fn span(&self, span: SwcSpan) -> Span {
        let start = self.offset(span.lo);
        Span::new(start, self.offset(span.hi).max(start))
    }

    fn join(&self, lo: SwcSpan, hi: SwcSpan) -> Span {
        let start = self.offset(lo.lo);
        Span::new(start, self.offset(hi.hi).max(start))
    }

    fn open(&mut self, kind: &'static str, span: SwcSpan) -> NodeId {
        let span = self.span(span);
        self.open_span(kind, span)
    }

    fn open_span(&mut self, kind: &'static str, span: Span) -> NodeId {
        let field = self.pending_field.take();
        let parent = self.stack.last().copied();
        let id = self.arena.alloc(AstNode {
            kind,
            span,
            parent,
            field,
            children: Vec::new(),
            attrs: Vec::new(),
            index: 0,
        });
        if let Some(parent) = parent {
            self.arena[parent].children.push(id);
        }
        self.stack.push(id);
        id
    }

    fn close(&mut self) {
        self.stack.pop();
    }

    fn leaf(&mut self, kind: &'static str, span: SwcSpan) {
        self.open(kind, span);
        self.close();
    }

    fn attr(&mut self, name: &'static str, value: impl Into<AttrValue>) {
        if let Some(id) = self.stack.last().copied() {
            self.arena[id].attrs.push((name, value.into()));
        }
    }

    fn field<N: VisitWith<Self> + ?Sized>(&mut self, name: &'static str, node: &N) {
        self.pending_field = Some(name);
        node.visit_with(self);
        self.pending_field = None;
    }

    fn expr(&mut self, name: &'static str, expr: &Expr) {
        self.field(name, expr);
    }

    fn opt_expr(&mut self, name: &'static str, expr: &Option<Box<Expr>>) {
        if let Some(expr) = expr {
            self.field(name, &**expr);
        }
    }

    fn stmts<N: VisitWith<Self>>(&mut self, name: &'static str, items: &[N]) {
        for item in items {
            self.field(name, item);
        }
    }

    fn text(&self, span: Span) -> &'s str {
        self.source.get(span.start..span.end).unwrap_or("")
    }

    fn prop_name(&mut self, key: &PropName) {
        self.attr("computed", matches!(key, PropName::Computed(_)));
        self.field("key", key);
    }

    fn function_body(&mut self, function: &Function) {
        self.attr("async", function.is_async);
        self.attr("generator", function.is_generator);
        for param in &function.params {
            self.field("params", &param.pat);
        }
        if let Some(body) = &function.body {
            self.field("body", body);
        }
    }

    fn function_expr(&mut self, span: Span, function: &Function) {
        self.pending_field = Some("value");
        self.open_span("FunctionExpression", span);
        self.function_body(function);
        self.close();
    }

    fn class_body(&mut self, class: &Class, header_end: usize) {
        for decorator in &class.decorators {
            self.field("decorators", decorator);
        }
        if let Some(super_class) = &class.super_class {
            self.field("superClass", &**super_class);
        }

        let class_span = self.span(class.span);
        let search_from = header_end.max(class_span.start);
        let body_start = self
            .source
            .get(search_from..class_span.end)
            .and_then(|rest| rest.find('{'))
            .map(|offset| search_from + offset)
            .unwrap_or(search_from);

        self.pending_field = Some("body");
        self.open_span("ClassBody", Span::new(body_start, class_span.end));
        for member in &class.body {
            self.field("body", member);
        }
        self.close();
    }

    fn class_header_end(&self, ident: Option<&Ident>, class: &Class) -> usize {
        let mut end = self.span(class.span).start;
        if let Some(ident) = ident {
            end = end.max(self.span(ident.span).end);
        }
        if let Some(super_class) = &class.super_class {
            end = end.max(self.span(super_class.span()).end);
        }
        end
    }

    fn member(&mut self, n: &MemberExpr, optional: bool) {
        self.open("MemberExpression", n.span);
        self.attr("computed", matches!(n.prop, MemberProp::Computed(_)));
        self.attr("optional", optional);
        self.expr("object", &n.obj);
        match &n.prop {
            MemberProp::Ident(ident) => self.field("property", ident),
            MemberProp::PrivateName(name) => self.field("property", name),
            MemberProp::Computed(computed) => self.expr("property", &computed.expr),
        }
        self.close();
    }

    fn call(&mut self, span: SwcSpan, callee: &Expr, args: &[ExprOrSpread], optional: bool) {
        self.open("CallExpression", span);
        self.attr("optional", optional);
        self.expr("callee", callee);
        self.stmts("arguments", args);
        self.close();
    }

    fn literal(&mut self, span: SwcSpan, value: AttrValue) {
        self.open("Literal", span);
        let raw = self.text(self.span(span)).to_string();
        self.attr("value", value);
        self.attr("raw", raw);
        self.close();
    }
}

impl Visit for Lowerer<'_> {
    // Statements

    fn visit_expr_stmt(&mut self, n: &ExprStmt) {
        self.open("ExpressionStatement", n.span);
        self.expr("expression", &n.expr);
        self.close();
    }

    fn visit_block_stmt(&mut self, n: &BlockStmt) {
        self.open("BlockStatement", n.span);
        self.stmts("body", &n.stmts);
        self.close();
    }

    fn visit_empty_stmt(&mut self, n: &EmptyStmt) {
        self.leaf("EmptyStatement", n.span);
    }

    fn visit_debugger_stmt(&mut self, n: &DebuggerStmt) {
        self.leaf("DebuggerStatement", n.span);
    }

    fn visit_with_stmt(&mut self, n: &WithStmt) {
        self.open("WithStatement", n.span);
        self.expr("object", &n.obj);
        self.field("body", &*n.body);
        self.close();
    }

    fn visit_return_stmt(&mut self, n: &ReturnStmt) {
        self.open("ReturnStatement", n.span);
        self.opt_expr("argument", &n.arg);
        self.close();
    }

    fn visit_labeled_stmt(&mut self, n: &LabeledStmt) {
        self.open("LabeledStatement", n.span);
        self.field("label", &n.label);
        self.field("body", &*n.body);
        self.close();
    }

    fn visit_break_stmt(&mut self, n: &BreakStmt) {
        self.open("BreakStatement", n.span);
        if let Some(label) = &n.label {
            self.field("label", label);
        }
        self.close();
    }

    fn visit_continue_stmt(&mut self, n: &ContinueStmt) {
        self.open("ContinueStatement", n.span);
        if let Some(label) = &n.label {
            self.field("label", label);
        }
        self.close();
    }

    fn visit_if_stmt(&mut self, n: &IfStmt) {
        self.open("IfStatement", n.span);
        self.expr("test", &n.test);
        self.field("consequent", &*n.cons);
        if let Some(alt) = &n.alt {
            self.field("alternate", &**alt);
        }
        self.close();
    }

    fn visit_switch_stmt(&mut self, n: &SwitchStmt) {
        self.open("SwitchStatement", n.span);
        self.expr("discriminant", &n.discriminant);
        self.stmts("cases", &n.cases);
        self.close();
    }

    fn visit_switch_case(&mut self, n: &SwitchCase) {
        self.open("SwitchCase", n.span);
        self.opt_expr("test", &n.test);
        self.stmts("consequent", &n.cons);
        self.close();
    }

    fn visit_throw_stmt(&mut self, n: &ThrowStmt) {
        self.open("ThrowStatement", n.span);
        self.expr("argument", &n.arg);
        self.close();
    }

    fn visit_try_stmt(&mut self, n: &TryStmt) {
        self.open("TryStatement", n.span);
        self.field("block", &n.block);
        if let Some(handler) = &n.handler {
            self.field("handler", handler);
        }
        if let Some(finalizer) = &n.finalizer {
            self.field("finalizer", finalizer);
        }
        self.close();
    }

    fn visit_catch_clause(&mut self, n: &CatchClause) {
        self.open("CatchClause", n.span);
        if let Some(param) = &n.param {
            self.field("param", param);
        }
        self.field("body", &n.body);
        self.close();
    }

    fn visit_while_stmt(&mut self, n: &WhileStmt) {
        self.open("WhileStatement", n.span);
        self.expr("test", &n.test);
        self.field("body", &*n.body);
        self.close();
    }

    fn visit_do_while_stmt(&mut self, n: &DoWhileStmt) {
        self.open("DoWhileStatement", n.span);
        self.field("body", &*n.body);
        self.expr("test", &n.test);
        self.close();
    }

    fn visit_for_stmt(&mut self, n: &ForStmt) {
        self.open("ForStatement", n.span);
        if let Some(init) = &n.init {
            self.field("init", init);
        }
        self.opt_expr("test", &n.test);
        self.opt_expr("update", &n.update);
        self.field("body", &*n.body);
        self.close();
    }

    fn visit_for_in_stmt(&mut self, n: &ForInStmt) {
        self.open("ForInStatement", n.span);
        self.field("left", &n.left);
        self.expr("right", &n.right);
        self.field("body", &*n.body);
        self.close();
    }

    fn visit_for_of_stmt(&mut self, n: &ForOfStmt) {
        self.open("ForOfStatement", n.span);
        self.attr("await", n.is_await);
        self.field("left", &n.left);
        self.expr("right", &n.right);
        self.field("body", &*n.body);
        self.close();
    }

    // Declarations

    fn visit_var_decl(&mut self, n: &VarDecl) {
        self.open("VariableDeclaration", n.span);
        let kind = match n.kind {
            VarDeclKind::Var => "var",
            VarDeclKind::Let => "let",
            VarDeclKind::Const => "const",
        };
        self.attr("kind", kind);
        self.stmts("declarations", &n.decls);
        self.close();
    }

    fn visit_using_decl(&mut self, n: &UsingDecl) {
        self.open("VariableDeclaration", n.span);
        self.attr("kind", if n.is_await { "await using" } else { "using" });
        self.stmts("declarations", &n.decls);
        self.close();
    }

    fn visit_var_declarator(&mut self, n: &VarDeclarator) {
        self.open("VariableDeclarator", n.span);
        self.field("id", &n.name);
        self.opt_expr("init", &n.init);
        self.close();
    }

    fn visit_fn_decl(&mut self, n: &FnDecl) {
        if n.declare {
            return;
        }
        self.open("FunctionDeclaration", n.function.span);
        self.field("id", &n.ident);
        self.function_body(&n.function);
        self.close();
    }

    fn visit_fn_expr(&mut self, n: &FnExpr) {
        self.open("FunctionExpression", n.function.span);
        if let Some(ident) = &n.ident {
            self.field("id", ident);
        }
        self.function_body(&n.function);
        self.close();
    }

    fn visit_arrow_expr(&mut self, n: &ArrowExpr) {
        self.open("ArrowFunctionExpression", n.span);
        self.attr("async", n.is_async);
        self.attr("generator", false);
        self.attr("expression", matches!(&*n.body, BlockStmtOrExpr::Expr(_)));
        self.stmts("params", &n.params);
        self.field("body", &*n.body);
        self.close();
    }

    fn visit_class_decl(&mut self, n: &ClassDecl) {
        if n.declare {
            return;
        }
        self.open("ClassDeclaration", n.class.span);
        self.field("id", &n.ident);
        let header_end = self.class_header_end(Some(&n.ident), &n.class);
        self.class_body(&n.class, header_end);
        self.close();
    }

    fn visit_class_expr(&mut self, n: &ClassExpr) {
        self.open("ClassExpression", n.class.span);
        if let Some(ident) = &n.ident {
            self.field("id", ident);
        }
        let header_end = self.class_header_end(n.ident.as_ref(), &n.class);
        self.class_body(&n.class, header_end);
        self.close();
    }

    fn visit_class_member(&mut self, n: &ClassMember) {
        match n {
            ClassMember::Empty(_) | ClassMember::TsIndexSignature(_) => {}
            _ => n.visit_children_with(self),
        }
    }

    fn visit_constructor(&mut self, n: &Constructor) {
        self.open("MethodDefinition", n.span);
        self.attr("kind", "constructor");
        self.attr("static", false);
        self.prop_name(&n.key);

        let value_span = Span::new(self.span(n.key.span()).end, self.span(n.span).end);
        self.pending_field = Some("value");
        self.open_span("FunctionExpression", value_span);
        self.attr("async", false);
        self.attr("generator", false);
        for param in &n.params {
            match param {
                ParamOrTsParamProp::Param(param) => self.field("params", &param.pat),
                ParamOrTsParamProp::TsParamProp(prop) => match &prop.param {
                    TsParamPropParam::Ident(ident) => self.field("params", ident),
                    TsParamPropParam::Assign(assign) => self.field("params", assign),
                },
            }
        }
        if let Some(body) = &n.body {
            self.field("body", body);
        }
        self.close();
        self.close();
    }

    fn visit_class_method(&mut self, n: &ClassMethod) {
        self.open("MethodDefinition", n.span);
        self.attr("kind", method_kind(n.kind));
        self.attr("static", n.is_static);
        self.prop_name(&n.key);
        let span = self.span(n.function.span);
        self.function_expr(span, &n.function);
        self.close();
    }

    fn visit_private_method(&mut self, n: &PrivateMethod) {
        self.open("MethodDefinition", n.span);
        self.attr("kind", method_kind(n.kind));
        self.attr("static", n.is_static);
        self.attr("computed", false);
        self.field("key", &n.key);
        let span = self.span(n.function.span);
        self.function_expr(span, &n.function);
        self.close();
    }

    fn visit_class_prop(&mut self, n: &ClassProp) {
        self.open("PropertyDefinition", n.span);
        self.attr("static", n.is_static);
        self.prop_name(&n.key);
        self.opt_expr("value", &n.value);
        self.close();
    }

    fn visit_private_prop(&mut self, n: &PrivateProp) {
        self.open("PropertyDefinition", n.span);
        self.attr("static", n.is_static);
        self.attr("computed", false);
        self.field("key", &n.key);
        self.opt_expr("value", &n.value);
        self.close();
    }

    fn visit_static_block(&mut self, n: &StaticBlock) {
        self.open("StaticBlock", n.span);
        self.stmts("body", &n.body.stmts);
        self.close();
    }

    fn visit_decorator(&mut self, n: &Decorator) {
        self.open("Decorator", n.span);
        self.expr("expression", &n.expr);
        self.close();
    }

    // Modules

    fn visit_import_decl(&mut self, n: &ImportDecl) {
        self.open("ImportDeclaration", n.span);
        self.stmts("specifiers", &n.specifiers);
        self.field("source", &*n.src);
        self.close();
    }

    fn visit_import_named_specifier(&mut self, n: &ImportNamedSpecifier) {
        self.open("ImportSpecifier", n.span);
        match &n.imported {
            Some(imported) => self.field("imported", imported),
            None => self.field("imported", &n.local),
        }
        self.field("local", &n.local);
        self.close();
    }

    fn visit_import_default_specifier(&mut self, n: &ImportDefaultSpecifier) {
        self.open("ImportDefaultSpecifier", n.span);
        self.field("local", &n.local);
        self.close();
    }

    fn visit_import_star_as_specifier(&mut self, n: &ImportStarAsSpecifier) {
        self.open("ImportNamespaceSpecifier", n.span);
        self.field("local", &n.local);
        self.close();
    }

    fn visit_export_decl(&mut self, n: &ExportDecl) {
        self.open("ExportNamedDeclaration", n.span);
        self.field("declaration", &n.decl);
        self.close();
    }

    fn visit_named_export(&mut self, n: &NamedExport) {
        self.open("ExportNamedDeclaration", n.span);
        self.stmts("specifiers", &n.specifiers);
        if let Some(src) = &n.src {
            self.field("source", &**src);
        }
        self.close();
    }

    fn visit_export_named_specifier(&mut self, n: &ExportNamedSpecifier) {
        self.open("ExportSpecifier", n.span);
        self.field("local", &n.orig);
        match &n.exported {
            Some(exported) => self.field("exported", exported),
            None => self.field("exported", &n.orig),
        }
        self.close();
    }

    fn visit_export_namespace_specifier(&mut self, n: &ExportNamespaceSpecifier) {
        self.open("ExportNamespaceSpecifier", n.span);
        self.field("exported", &n.name);
        self.close();
    }

    fn visit_export_default_specifier(&mut self, n: &ExportDefaultSpecifier) {
        self.open("ExportDefaultSpecifier", n.exported.span);
        self.field("exported", &n.exported);
        self.close();
    }

    fn visit_export_default_decl(&mut self, n: &ExportDefaultDecl) {
        self.open("ExportDefaultDeclaration", n.span);
        match &n.decl {
            DefaultDecl::Fn(f) => {
                self.pending_field = Some("declaration");
                self.open("FunctionDeclaration", f.function.span);
                if let Some(ident) = &f.ident {
                    self.field("id", ident);
                }
                self.function_body(&f.function);
                self.close();
            }
            DefaultDecl::Class(c) => {
                self.pending_field = Some("declaration");
                self.open("ClassDeclaration", c.class.span);
                if let Some(ident) = &c.ident {
                    self.field("id", ident);
                }
                let header_end = self.class_header_end(c.ident.as_ref(), &c.class);
                self.class_body(&c.class, header_end);
                self.close();
            }
            DefaultDecl::TsInterfaceDecl(_) => {}
        }
        self.close();
    }

    fn visit_export_default_expr(&mut self, n: &ExportDefaultExpr) {
        self.open("ExportDefaultDeclaration", n.span);
        self.expr("declaration", &n.expr);
        self.close();
    }

    fn visit_export_all(&mut self, n: &ExportAll) {
        self.open("ExportAllDeclaration", n.span);
        self.field("source", &*n.src);
        self.close();
    }

    // Identifiers and literals

    fn visit_ident(&mut self, n: &Ident) {
        self.open("Identifier", n.span);
        self.attr("name", n.sym.to_string());
        self.close();
    }

    fn visit_ident_name(&mut self, n: &IdentName) {
        self.open("Identifier", n.span);
        self.attr("name", n.sym.to_string());
        self.close();
    }

    fn visit_binding_ident(&mut self, n: &BindingIdent) {
        n.id.visit_with(self);
    }

    fn visit_private_name(&mut self, n: &PrivateName) {
        self.open("PrivateIdentifier", n.span);
        self.attr("name", n.name.to_string());
        self.close();
    }

    fn visit_str(&mut self, n: &Str) {
        self.literal(n.span, AttrValue::Str(n.value.to_string()));
    }

    fn visit_number(&mut self, n: &Number) {
        self.literal(n.span, AttrValue::Num(n.value));
    }

    fn visit_bool(&mut self, n: &Bool) {
        self.literal(n.span, AttrValue::Bool(n.value));
    }

    fn visit_null(&mut self, n: &Null) {
        self.literal(n.span, AttrValue::Null);
    }

    fn visit_big_int(&mut self, n: &BigInt) {
        self.open("Literal", n.span);
        let raw = self.text(self.span(n.span)).to_string();
        self.attr("bigint", raw.trim_end_matches('n').to_string());
        self.attr("raw", raw);
        self.close();
    }

    fn visit_regex(&mut self, n: &Regex) {
        self.open("Literal", n.span);
        let raw = self.text(self.span(n.span)).to_string();
        self.attr("raw", raw);
        self.attr("regex.pattern", n.exp.to_string());
        self.attr("regex.flags", n.flags.to_string());
        self.close();
    }

    fn visit_tpl(&mut self, n: &Tpl) {
        self.open("TemplateLiteral", n.span);
        for (index, quasi) in n.quasis.iter().enumerate() {
            self.field("quasis", quasi);
            if let Some(expr) = n.exprs.get(index) {
                self.expr("expressions", expr);
            }
        }
        self.close();
    }

    fn visit_tpl_element(&mut self, n: &TplElement) {
        self.open("TemplateElement", n.span);
        self.attr("value.raw", n.raw.to_string());
        self.attr("tail", n.tail);
        self.close();
    }

    fn visit_tagged_tpl(&mut self, n: &TaggedTpl) {
        self.open("TaggedTemplateExpression", n.span);
        self.expr("tag", &n.tag);
        self.field("quasi", &*n.tpl);
        self.close();
    }

    // Expressions

    fn visit_this_expr(&mut self, n: &ThisExpr) {
        self.leaf("ThisExpression", n.span);
    }

    fn visit_super(&mut self, n: &Super) {
        self.leaf("Super", n.span);
    }

    fn visit_array_lit(&mut self, n: &ArrayLit) {
        self.open("ArrayExpression", n.span);
        for elem in n.elems.iter().flatten() {
            self.field("elements", elem);
        }
        self.close();
    }

    fn visit_expr_or_spread(&mut self, n: &ExprOrSpread) {
        match n.spread {
            Some(dot3) => {
                let span = self.join(dot3, n.expr.span());
                self.open_span("SpreadElement", span);
                self.expr("argument", &n.expr);
                self.close();
            }
            None => {
                let expr: &Expr = &n.expr;
                expr.visit_with(self);
            }
        }
    }

    fn visit_spread_element(&mut self, n: &SpreadElement) {
        let span = self.join(n.dot3_token, n.expr.span());
        self.open_span("SpreadElement", span);
        self.expr("argument", &n.expr);
        self.close();
    }

    fn visit_object_lit(&mut self, n: &ObjectLit) {
        self.open("ObjectExpression", n.span);
        self.stmts("properties", &n.props);
        self.close();
    }

    fn visit_prop(&mut self, n: &Prop) {
        match n {
            Prop::Shorthand(ident) => {
                self.open("Property", ident.span);
                self.attr("kind", "init");
                self.attr("shorthand", true);
                self.attr("method", false);
                self.attr("computed", false);
                self.field("key", ident);
                self.field("value", ident);
                self.close();
            }
            _ => n.visit_children_with(self),
        }
    }

    fn visit_key_value_prop(&mut self, n: &KeyValueProp) {
        let span = self.join(n.key.span(), n.value.span());
        self.open_span("Property", span);
        self.attr("kind", "init");
        self.attr("shorthand", false);
        self.attr("method", false);
        self.prop_name(&n.key);
        self.expr("value", &n.value);
        self.close();
    }

    fn visit_assign_prop(&mut self, n: &AssignProp) {
        let span = self.join(n.key.span, n.value.span());
        self.open_span("Property", span);
        self.attr("kind", "init");
        self.attr("shorthand", true);
        self.attr("method", false);
        self.attr("computed", false);
        self.field("key", &n.key);
        self.pending_field = Some("value");
        self.open_span("AssignmentPattern", span);
        self.field("left", &n.key);
        self.expr("right", &n.value);
        self.close();
        self.close();
    }

    fn visit_getter_prop(&mut self, n: &GetterProp) {
        self.open("Property", n.span);
        self.attr("kind", "get");
        self.attr("shorthand", false);
        self.attr("method", false);
        self.prop_name(&n.key);
        let value_span = Span::new(self.span(n.key.span()).end, self.span(n.span).end);
        self.pending_field = Some("value");
        self.open_span("FunctionExpression", value_span);
        self.attr("async", false);
        self.attr("generator", false);
        if let Some(body) = &n.body {
            self.field("body", body);
        }
        self.close();
        self.close();
    }

    fn visit_setter_prop(&mut self, n: &SetterProp) {
        self.open("Property", n.span);
        self.attr("kind", "set");
        self.attr("shorthand", false);
        self.attr("method", false);
        self.prop_name(&n.key);
        let value_span = Span::new(self.span(n.key.span()).end, self.span(n.span).end);
        self.pending_field = Some("value");
        self.open_span("FunctionExpression", value_span);
        self.attr("async", false);
        self.attr("generator", false);
        self.field("params", &*n.param);
        if let Some(body) = &n.body {
            self.field("body", body);
        }
        self.close();
        self.close();
    }

    fn visit_method_prop(&mut self, n: &MethodProp) {
        let span = self.join(n.key.span(), n.function.span);
        self.open_span("Property", span);
        self.attr("kind", "init");
        self.attr("shorthand", false);
        self.attr("method", true);
        self.prop_name(&n.key);
        let value_span = self.span(n.function.span);
        self.function_expr(value_span, &n.function);
        self.close();
    }

    fn visit_unary_expr(&mut self, n: &UnaryExpr) {
        self.open("UnaryExpression", n.span);
        self.attr("operator", n.op.as_str());
        self.attr("prefix", true);
        self.expr("argument", &n.arg);
        self.close();
    }

    fn visit_update_expr(&mut self, n: &UpdateExpr) {
        self.open("UpdateExpression", n.span);
        self.attr("operator", n.op.as_str());
        self.attr("prefix", n.prefix);
        self.expr("argument", &n.arg);
        self.close();
    }

    fn visit_bin_expr(&mut self, n: &BinExpr) {
        let kind = match n.op {
            BinaryOp::LogicalAnd | BinaryOp::LogicalOr | BinaryOp::NullishCoalescing => {
                "LogicalExpression"
            }
            _ => "BinaryExpression",
        };
        self.open(kind, n.span);
        self.attr("operator", n.op.as_str());
        self.expr("left", &n.left);
        self.expr("right", &n.right);
        self.close();
    }

    fn visit_assign_expr(&mut self, n: &AssignExpr) {
        self.open("AssignmentExpression", n.span);
        self.attr("operator", n.op.as_str());
        self.field("left", &n.left);
        self.expr("right", &n.right);
        self.close();
    }

    fn visit_member_expr(&mut self, n: &MemberExpr) {
        self.member(n, false);
    }

    fn visit_super_prop_expr(&mut self, n: &SuperPropExpr) {
        self.open("MemberExpression", n.span);
        self.attr("computed", matches!(n.prop, SuperProp::Computed(_)));
        self.attr("optional", false);
        self.field("object", &n.obj);
        match &n.prop {
            SuperProp::Ident(ident) => self.field("property", ident),
            SuperProp::Computed(computed) => self.expr("property", &computed.expr),
        }
        self.close();
    }

    fn visit_cond_expr(&mut self, n: &CondExpr) {
        self.open("ConditionalExpression", n.span);
        self.expr("test", &n.test);
        self.expr("consequent", &n.cons);
        self.expr("alternate", &n.alt);
        self.close();
    }

    fn visit_call_expr(&mut self, n: &CallExpr) {
        match &n.callee {
            Callee::Expr(callee) => self.call(n.span, callee, &n.args, false),
            Callee::Super(sup) => {
                self.open("CallExpression", n.span);
                self.attr("optional", false);
                self.field("callee", sup);
                self.stmts("arguments", &n.args);
                self.close();
            }
            Callee::Import(_) => {
                self.open("ImportExpression", n.span);
                if let Some(source) = n.args.first() {
                    self.field("source", source);
                }
                self.close();
            }
        }
    }

    fn visit_new_expr(&mut self, n: &NewExpr) {
        self.open("NewExpression", n.span);
        self.expr("callee", &n.callee);
        if let Some(args) = &n.args {
            self.stmts("arguments", args);
        }
        self.close();
    }

    fn visit_seq_expr(&mut self, n: &SeqExpr) {
        self.open("SequenceExpression", n.span);
        for expr in &n.exprs {
            self.expr("expressions", expr);
        }
        self.close();
    }

    fn visit_yield_expr(&mut self, n: &YieldExpr) {
        self.open("YieldExpression", n.span);
        self.attr("delegate", n.delegate);
        self.opt_expr("argument", &n.arg);
        self.close();
    }

    fn visit_await_expr(&mut self, n: &AwaitExpr) {
        self.open("AwaitExpression", n.span);
        self.expr("argument", &n.arg);
        self.close();
    }

    fn visit_paren_expr(&mut self, n: &ParenExpr) {
        self.open("ParenthesizedExpression", n.span);
        self.expr("expression", &n.expr);
        self.close();
    }

    fn visit_opt_chain_expr(&mut self, n: &OptChainExpr) {
        self.open("ChainExpression", n.span);
        self.pending_field = Some("expression");
        match &*n.base {
            OptChainBase::Member(member) => self.member(member, n.optional),
            OptChainBase::Call(call) => self.visit_opt_call_with(call, n.optional),
        }
        self.close();
    }

    fn visit_meta_prop_expr(&mut self, n: &MetaPropExpr) {
        self.open("MetaProperty", n.span);
        let text = self.text(self.span(n.span)).to_string();
        let mut parts = text.split('.').map(str::trim);
        self.attr("meta", parts.next().unwrap_or_default().to_string());
        self.attr("property", parts.next().unwrap_or_default().to_string());
        self.close();
    }

    // Patterns

    fn visit_array_pat(&mut self, n: &ArrayPat) {
        self.open("ArrayPattern", n.span);
        for elem in n.elems.iter().flatten() {
            self.field("elements", elem);
        }
        self.close();
    }

    fn visit_object_pat(&mut self, n: &ObjectPat) {
        self.open("ObjectPattern", n.span);
        self.stmts("properties", &n.props);
        self.close();
    }

    fn visit_key_value_pat_prop(&mut self, n: &KeyValuePatProp) {
        let span = self.join(n.key.span(), n.value.span());
        self.open_span("Property", span);
        self.attr("kind", "init");
        self.attr("shorthand", false);
        self.attr("method", false);
        self.prop_name(&n.key);
        self.field("value", &*n.value);
        self.close();
    }

    fn visit_assign_pat_prop(&mut self, n: &AssignPatProp) {
        self.open("Property", n.span);
        self.attr("kind", "init");
        self.attr("shorthand", true);
        self.attr("method", false);
        self.attr("computed", false);
        self.field("key", &n.key.id);
        match &n.value {
            Some(value) => {
                let span = self.span(n.span);
                self.pending_field = Some("value");
                self.open_span("AssignmentPattern", span);
                self.field("left", &n.key.id);
                self.expr("right", value);
                self.close();
            }
            None => self.field("value", &n.key.id),
        }
        self.close();
    }

    fn visit_rest_pat(&mut self, n: &RestPat) {
        self.open("RestElement", n.span);
        self.field("argument", &*n.arg);
        self.close();
    }

    fn visit_assign_pat(&mut self, n: &AssignPat) {
        self.open("AssignmentPattern", n.span);
        self.field("left", &*n.left);
        self.expr("right", &n.right);
        self.close();
    }

    // JSX names are not references.

    fn visit_jsx_element_name(&mut self, n: &JSXElementName) {
        if let JSXElementName::Ident(ident) = n {
            self.open("JSXIdentifier", ident.span);
            self.attr("name", ident.sym.to_string());
            self.close();
        }
    }

    fn visit_jsx_attr_name(&mut self, n: &JSXAttrName) {
        if let JSXAttrName::Ident(ident) = n {
            self.open("JSXIdentifier", ident.span);
            self.attr("name", ident.sym.to_string());
            self.close();
        }
    }

    // Type-level TypeScript syntax is dropped.

    fn visit_ts_type(&mut self, _: &TsType) {}

    fn visit_ts_type_ann(&mut self, _: &TsTypeAnn) {}

    fn visit_ts_type_param_decl(&mut self, _: &TsTypeParamDecl) {}

    fn visit_ts_type_param_instantiation(&mut self, _: &TsTypeParamInstantiation) {}

    fn visit_ts_interface_decl(&mut self, _: &TsInterfaceDecl) {}

    fn visit_ts_type_alias_decl(&mut self, _: &TsTypeAliasDecl) {}

    fn visit_ts_enum_decl(&mut self, _: &TsEnumDecl) {}

    fn visit_ts_module_decl(&mut self, _: &TsModuleDecl) {}
}

impl Lowerer<'_> {
    fn visit_opt_call_with(&mut self, call: &OptCall, optional: bool) {
        self.call(call.span, &call.callee, &call.args, optional);
    }
}

fn method_kind(kind: MethodKind) -> &'static str {
    match kind {
        MethodKind::Method => "method",
        MethodKind::Getter => "get",
        MethodKind::Setter => "set",
    }
}
