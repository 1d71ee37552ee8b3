//! The single-pass module walker.
//!
//! Bindings are recorded eagerly; reads are queued as deferred accesses with
//! their enclosing attribute/string-annotation context and linked to
//! assignments once the walk finishes, so forward references inside function
//! bodies resolve without a second traversal.

use pyscope_ast::visitor::{self, Visitor};
use pyscope_ast::{
    Alias, Ast, Comprehension, Expr, ExprCall, ExprContext, ExprId, ExprLambda, ExprName,
    ExprStringLiteral, ExprSubscript, NodeKey, Parameters, Stmt, StmtClassDef, StmtFunctionDef,
    StmtId, StmtTypeAlias, TypeParam, TypeParams,
};
use smallvec::SmallVec;

use crate::access::{Access, AccessFlags, DeferredAccess};
use crate::builtins;
use crate::error::ScopeError;
use crate::model::SemanticModel;
use crate::qualified_name::QualifiedName;
use crate::resolve;
use crate::scope::{ScopeId, ScopeKind};

/// Analyzes a module against the standard builtin namespace.
pub fn analyze(ast: &Ast) -> Result<SemanticModel<'_>, ScopeError> {
    analyze_with_builtins(ast, builtins::PYTHON_BUILTINS)
}

/// Analyzes a module against a caller-provided builtin table.
pub fn analyze_with_builtins<'a>(
    ast: &'a Ast,
    builtins: &'a [&'a str],
) -> Result<SemanticModel<'a>, ScopeError> {
    tracing::debug!(statements = ast.body.len(), "analyzing module");
    let mut visitor = ScopeVisitor::new(ast, builtins);
    visitor.visit_body(ast, &ast.body);
    if let Some(error) = visitor.error {
        return Err(error);
    }
    let ScopeVisitor {
        mut model,
        deferred,
        ..
    } = visitor;
    resolve::resolve_deferred(&mut model, deferred);
    Ok(model)
}

/// Calls whose arguments are type hints rather than values.
#[derive(Copy, Clone)]
enum TypeHintRule {
    /// Every argument after the first is a hint (`NewType("N", int)`).
    ArgumentsAfterFirst,
    /// Only the first argument is a hint (`cast(T, value)`).
    FirstArgumentOnly,
}

const TYPE_HINT_CALLS: &[(&str, TypeHintRule)] = &[
    ("typing.NewType", TypeHintRule::ArgumentsAfterFirst),
    ("typing.TypeVar", TypeHintRule::ArgumentsAfterFirst),
    ("typing.cast", TypeHintRule::FirstArgumentOnly),
];

fn type_hint_rule(qualified_names: &[QualifiedName]) -> Option<TypeHintRule> {
    TYPE_HINT_CALLS.iter().find_map(|(name, rule)| {
        qualified_names
            .iter()
            .any(|qualified| qualified.name == *name)
            .then_some(*rule)
    })
}

/// Statements that bump the scope's assignment counter after their children.
/// `for` is handled separately: its counter bump sits between the target and
/// the iterator.
fn is_assignment_like(stmt: &Stmt) -> bool {
    matches!(
        stmt,
        Stmt::Assign(_)
            | Stmt::AnnAssign(_)
            | Stmt::AugAssign(_)
            | Stmt::ClassDef(_)
            | Stmt::FunctionDef(_)
            | Stmt::Global(_)
            | Stmt::Nonlocal(_)
            | Stmt::Import(_)
            | Stmt::ImportFrom(_)
            | Stmt::TypeAlias(_)
    )
}

struct ScopeVisitor<'a> {
    ast: &'a Ast,
    model: SemanticModel<'a>,
    scope: ScopeId,
    deferred: Vec<DeferredAccess>,
    /// Topmost attribute chain per call frame; names inside it become
    /// candidates for dotted re-attribution.
    attribute_stack: Vec<Option<ExprId>>,
    /// One entry per call/subscript frame; the top decides the TYPE_HINT flag.
    type_hint_stack: Vec<bool>,
    annotation_depth: u32,
    /// Outermost string literal currently being re-walked as an annotation.
    string_annotation: Option<ExprId>,
    /// Non-zero inside a `Literal[...]` subscript, where strings are values.
    ignored_subscripts: u32,
    error: Option<ScopeError>,
}

impl<'a> ScopeVisitor<'a> {
    fn new(ast: &'a Ast, builtins: &'a [&'a str]) -> Self {
        Self {
            ast,
            model: SemanticModel::new(ast, builtins),
            scope: ScopeId::global(),
            deferred: Vec::new(),
            attribute_stack: vec![None],
            type_hint_stack: vec![false],
            annotation_depth: 0,
            string_annotation: None,
            ignored_subscripts: 0,
            error: None,
        }
    }

    fn enter(&mut self, kind: ScopeKind, node: NodeKey, name: Option<&'a str>) {
        self.scope = self.model.push_scope(kind, self.scope, node, name);
        tracing::trace!(?kind, scope = ?self.scope, "entered scope");
    }

    fn top_attribute(&self) -> Option<ExprId> {
        self.attribute_stack.last().copied().flatten()
    }

    fn in_type_hint(&self) -> bool {
        self.type_hint_stack.last().copied().unwrap_or(false)
    }

    fn visit_annotation(&mut self, expr: ExprId) {
        self.annotation_depth += 1;
        self.visit_expr(self.ast, expr);
        self.annotation_depth -= 1;
    }

    fn visit_name(&mut self, expr: ExprId, name: &'a ExprName) {
        match name.ctx {
            ExprContext::Store => {
                self.model
                    .record_assignment(self.scope, name.id.as_str(), NodeKey::Expr(expr));
            }
            ExprContext::Load | ExprContext::Del => {
                let mut flags = AccessFlags::empty();
                if self.annotation_depth > 0 {
                    flags |= AccessFlags::ANNOTATION;
                }
                if self.in_type_hint() {
                    flags |= AccessFlags::TYPE_HINT;
                }
                let access = self.model.push_access(Access {
                    node: expr,
                    name: name.id.to_string(),
                    scope: self.scope,
                    flags,
                    index: self.model[self.scope].assignment_count,
                    assignments: SmallVec::new(),
                });
                self.deferred.push(DeferredAccess {
                    access,
                    enclosing_attribute: self.top_attribute(),
                    enclosing_string_annotation: self.string_annotation,
                });
            }
        }
    }

    fn visit_function_def(&mut self, stmt: StmtId, def: &'a StmtFunctionDef) {
        let ast = self.ast;
        self.model
            .record_assignment(self.scope, def.name.as_str(), NodeKey::Stmt(stmt));

        let outer = self.scope;
        if let Some(type_params) = &def.type_params {
            self.enter(ScopeKind::Annotation, NodeKey::Stmt(stmt), None);
            self.visit_type_params(stmt, type_params);
        }
        let def_parent = self.scope;

        self.enter(
            ScopeKind::Function,
            NodeKey::Stmt(stmt),
            Some(def.name.as_str()),
        );
        self.visit_parameters(NodeKey::Stmt(stmt), &def.parameters, def_parent);
        self.model.bump_assignment_count(self.scope);
        self.visit_body(ast, &def.body);
        self.scope = def_parent;

        for &decorator in &def.decorator_list {
            self.visit_expr(ast, decorator);
        }
        if let Some(returns) = def.returns {
            self.visit_annotation(returns);
        }
        self.scope = outer;
    }

    /// Records each parameter in the current (function) scope; defaults and
    /// annotations belong to the enclosing scope.
    fn visit_parameters(&mut self, owner: NodeKey, parameters: &'a Parameters, parent: ScopeId) {
        let ast = self.ast;
        for parameter in parameters.iter() {
            self.model
                .record_assignment(self.scope, parameter.name.as_str(), owner);
            let function_scope = self.scope;
            self.scope = parent;
            if let Some(default) = parameter.default {
                self.visit_expr(ast, default);
            }
            if let Some(annotation) = parameter.annotation {
                self.visit_annotation(annotation);
            }
            self.scope = function_scope;
        }
    }

    fn visit_class_def(&mut self, stmt: StmtId, def: &'a StmtClassDef) {
        let ast = self.ast;
        self.model
            .record_assignment(self.scope, def.name.as_str(), NodeKey::Stmt(stmt));
        for &decorator in &def.decorator_list {
            self.visit_expr(ast, decorator);
        }

        let outer = self.scope;
        if let Some(type_params) = &def.type_params {
            self.enter(ScopeKind::Annotation, NodeKey::Stmt(stmt), None);
            self.visit_type_params(stmt, type_params);
        }
        for &base in &def.bases {
            self.visit_expr(ast, base);
        }
        for keyword in &def.keywords {
            self.visit_expr(ast, keyword.value);
        }

        self.enter(ScopeKind::Class, NodeKey::Stmt(stmt), Some(def.name.as_str()));
        self.visit_body(ast, &def.body);
        self.scope = outer;
    }

    fn visit_type_params(&mut self, owner: StmtId, type_params: &'a TypeParams) {
        let ast = self.ast;
        for param in &type_params.params {
            self.model
                .record_assignment(self.scope, param.name().as_str(), NodeKey::Stmt(owner));
            if let TypeParam::TypeVar(type_var) = param {
                if let Some(bound) = type_var.bound {
                    self.visit_expr(ast, bound);
                }
            }
            self.model.bump_assignment_count(self.scope);
        }
    }

    fn visit_type_alias(&mut self, stmt: StmtId, alias: &'a StmtTypeAlias) {
        self.model
            .record_assignment(self.scope, alias.name.as_str(), NodeKey::Stmt(stmt));
        let outer = self.scope;
        self.enter(ScopeKind::Annotation, NodeKey::Stmt(stmt), None);
        if let Some(type_params) = &alias.type_params {
            self.visit_type_params(stmt, type_params);
        }
        self.visit_expr(self.ast, alias.value);
        self.scope = outer;
    }

    fn visit_lambda(&mut self, expr: ExprId, lambda: &'a ExprLambda) {
        let outer = self.scope;
        self.enter(ScopeKind::Function, NodeKey::Expr(expr), None);
        self.visit_parameters(NodeKey::Expr(expr), &lambda.parameters, outer);
        self.model.bump_assignment_count(self.scope);
        self.visit_expr(self.ast, lambda.body);
        self.scope = outer;
    }

    /// Comprehensions and generator expressions. The first clause's iterator
    /// is evaluated in the enclosing scope; everything else, including every
    /// nested clause's iterator and the element expression(s), lives in the
    /// comprehension scope.
    fn visit_comp(&mut self, expr: ExprId, elts: &[ExprId], generators: &'a [Comprehension]) {
        let ast = self.ast;
        let Some((first, rest)) = generators.split_first() else {
            for &elt in elts {
                self.visit_expr(ast, elt);
            }
            return;
        };
        self.visit_expr(ast, first.iter);
        let outer = self.scope;
        self.enter(ScopeKind::Comprehension, NodeKey::Expr(expr), None);
        self.visit_expr(ast, first.target);
        // Things from here on can refer to the target.
        self.model.bump_assignment_count(self.scope);
        for &condition in &first.ifs {
            self.visit_expr(ast, condition);
        }
        self.visit_nested_comprehensions(rest);
        for &elt in elts {
            self.visit_expr(ast, elt);
        }
        self.scope = outer;
    }

    fn visit_nested_comprehensions(&mut self, clauses: &'a [Comprehension]) {
        let ast = self.ast;
        let Some((clause, rest)) = clauses.split_first() else {
            return;
        };
        self.visit_expr(ast, clause.target);
        self.visit_expr(ast, clause.iter);
        for &condition in &clause.ifs {
            self.visit_expr(ast, condition);
        }
        self.visit_nested_comprehensions(rest);
        self.model.bump_assignment_count(self.scope);
    }

    fn visit_call(&mut self, expr: ExprId, call: &'a ExprCall) {
        let ast = self.ast;
        self.attribute_stack.push(None);
        self.type_hint_stack.push(false);

        let qualified_names = self.model.qualified_names_of_expr_in(self.scope, expr);
        match type_hint_rule(&qualified_names) {
            Some(TypeHintRule::ArgumentsAfterFirst) => {
                self.visit_expr(ast, call.func);
                if let Some(top) = self.type_hint_stack.last_mut() {
                    *top = true;
                }
                for &arg in call.args.iter().skip(1) {
                    self.visit_expr(ast, arg);
                }
                for keyword in &call.keywords {
                    self.visit_expr(ast, keyword.value);
                }
            }
            Some(TypeHintRule::FirstArgumentOnly) => {
                self.visit_expr(ast, call.func);
                if let Some((&first, rest)) = call.args.split_first() {
                    self.type_hint_stack.push(true);
                    self.visit_expr(ast, first);
                    self.type_hint_stack.pop();
                    for &arg in rest {
                        self.visit_expr(ast, arg);
                    }
                    for keyword in &call.keywords {
                        self.visit_expr(ast, keyword.value);
                    }
                }
            }
            None => {
                self.visit_expr(ast, call.func);
                for &arg in &call.args {
                    self.visit_expr(ast, arg);
                }
                for keyword in &call.keywords {
                    self.visit_expr(ast, keyword.value);
                }
            }
        }

        self.type_hint_stack.pop();
        self.attribute_stack.pop();
    }

    fn visit_subscript(&mut self, sub: &'a ExprSubscript) {
        let ast = self.ast;
        let mut in_type_hint = false;
        let mut ignored = false;
        if ast[sub.value].is_name() {
            let qualified_names = self.model.qualified_names_of_expr_in(self.scope, sub.value);
            in_type_hint = qualified_names.iter().any(|qualified| {
                qualified.name.starts_with("typing.")
                    || qualified.name.starts_with("typing_extensions.")
            });
            ignored = qualified_names.iter().any(|qualified| {
                qualified.name == "typing.Literal" || qualified.name == "typing_extensions.Literal"
            });
        }
        self.type_hint_stack.push(in_type_hint);
        if ignored {
            self.ignored_subscripts += 1;
        }
        self.visit_expr(ast, sub.value);
        self.visit_expr(ast, sub.slice);
        if ignored {
            self.ignored_subscripts -= 1;
        }
        self.type_hint_stack.pop();
    }

    /// Forward-reference extraction: in an annotation or type-hint position,
    /// a string literal's parsed content is walked in place. Literals that
    /// failed to parse contribute nothing, matching the runtime, which also
    /// ignores malformed forward references until something evaluates them.
    fn visit_string(&mut self, expr: ExprId, literal: &'a ExprStringLiteral) {
        if !(self.in_type_hint() || self.annotation_depth > 0) || self.ignored_subscripts > 0 {
            return;
        }
        let Some(parsed) = literal.parsed_annotation else {
            return;
        };
        let top_level = self.string_annotation.is_none();
        if top_level {
            self.string_annotation = Some(expr);
        }
        self.visit_expr(self.ast, parsed);
        if top_level {
            self.string_annotation = None;
        }
    }

    /// A dotted `import a.b` binds every prefix; an `as` alias binds only
    /// the alias.
    fn visit_import_alike(&mut self, stmt: StmtId, names: &'a [Alias]) {
        for (position, alias) in names.iter().enumerate() {
            if let Some(asname) = &alias.asname {
                self.model
                    .record_import_assignment(self.scope, asname.as_str(), stmt, position);
            } else {
                let mut name: &'a str = alias.name.as_str();
                loop {
                    self.model
                        .record_import_assignment(self.scope, name, stmt, position);
                    match name.rfind('.') {
                        Some(dot) => name = &name[..dot],
                        None => break,
                    }
                }
            }
        }
    }
}

impl Visitor for ScopeVisitor<'_> {
    fn visit_stmt(&mut self, _ast: &Ast, stmt: StmtId) {
        if self.error.is_some() {
            return;
        }
        self.model.set_scope_of(NodeKey::Stmt(stmt), self.scope);
        let ast = self.ast;
        match &ast[stmt] {
            Stmt::FunctionDef(def) => self.visit_function_def(stmt, def),
            Stmt::ClassDef(def) => self.visit_class_def(stmt, def),
            Stmt::TypeAlias(alias) => self.visit_type_alias(stmt, alias),
            Stmt::AnnAssign(ann_assign) => {
                self.visit_expr(ast, ann_assign.target);
                self.visit_annotation(ann_assign.annotation);
                if let Some(value) = ann_assign.value {
                    self.visit_expr(ast, value);
                }
            }
            Stmt::For(for_stmt) => {
                self.visit_expr(ast, for_stmt.target);
                // The body and the iterator can refer to the target.
                self.model.bump_assignment_count(self.scope);
                self.visit_expr(ast, for_stmt.iter);
                self.visit_body(ast, &for_stmt.body);
                self.visit_body(ast, &for_stmt.orelse);
            }
            Stmt::With(with_stmt) => {
                for item in &with_stmt.items {
                    self.visit_expr(ast, item.context_expr);
                    if let Some(optional_vars) = item.optional_vars {
                        self.visit_expr(ast, optional_vars);
                        self.model.bump_assignment_count(self.scope);
                    }
                    self.model.bump_assignment_count(self.scope);
                }
                self.visit_body(ast, &with_stmt.body);
            }
            Stmt::Try(try_stmt) => {
                self.visit_body(ast, &try_stmt.body);
                for handler in &try_stmt.handlers {
                    if let Some(type_) = handler.type_ {
                        self.visit_expr(ast, type_);
                    }
                    if let Some(name) = handler.name {
                        self.visit_expr(ast, name);
                        self.model.bump_assignment_count(self.scope);
                    }
                    self.visit_body(ast, &handler.body);
                }
                self.visit_body(ast, &try_stmt.orelse);
                self.visit_body(ast, &try_stmt.finalbody);
            }
            Stmt::Import(import) => self.visit_import_alike(stmt, &import.names),
            Stmt::ImportFrom(import) => self.visit_import_alike(stmt, &import.names),
            Stmt::Global(global) => {
                for name in &global.names {
                    self.model.record_global_overwrite(self.scope, name.as_str());
                }
            }
            Stmt::Nonlocal(nonlocal) => {
                for name in &nonlocal.names {
                    if let Err(error) =
                        self.model
                            .record_nonlocal_overwrite(self.scope, name.as_str(), stmt)
                    {
                        self.error = Some(error);
                        return;
                    }
                }
            }
            _ => visitor::walk_stmt(self, ast, stmt),
        }
        if is_assignment_like(&ast[stmt]) {
            self.model.bump_assignment_count(self.scope);
        }
    }

    fn visit_expr(&mut self, _ast: &Ast, expr: ExprId) {
        if self.error.is_some() {
            return;
        }
        self.model.set_scope_of(NodeKey::Expr(expr), self.scope);
        let ast = self.ast;
        match &ast[expr] {
            Expr::Name(name) => self.visit_name(expr, name),
            Expr::Attribute(attribute) => {
                if let Some(top) = self.attribute_stack.last_mut() {
                    if top.is_none() {
                        *top = Some(expr);
                    }
                }
                self.visit_expr(ast, attribute.value);
                if let Some(top) = self.attribute_stack.last_mut() {
                    if *top == Some(expr) {
                        *top = None;
                    }
                }
            }
            Expr::Call(call) => self.visit_call(expr, call),
            Expr::Subscript(subscript) => self.visit_subscript(subscript),
            Expr::StringLiteral(literal) => self.visit_string(expr, literal),
            Expr::Lambda(lambda) => self.visit_lambda(expr, lambda),
            Expr::ListComp(comp) => self.visit_comp(expr, &[comp.elt], &comp.generators),
            Expr::SetComp(comp) => self.visit_comp(expr, &[comp.elt], &comp.generators),
            Expr::Generator(comp) => self.visit_comp(expr, &[comp.elt], &comp.generators),
            Expr::DictComp(comp) => {
                self.visit_comp(expr, &[comp.key, comp.value], &comp.generators);
            }
            Expr::Named(named) => {
                self.visit_expr(ast, named.target);
                self.visit_expr(ast, named.value);
                self.model.bump_assignment_count(self.scope);
            }
            _ => visitor::walk_expr(self, ast, expr),
        }
    }
}
