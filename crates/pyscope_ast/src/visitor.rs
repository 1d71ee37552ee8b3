//! Source-order traversal of an [`Ast`].
//!
//! Implementors override `visit_stmt`/`visit_expr` and delegate to the
//! `walk_*` functions for the nodes they do not treat specially.

use crate::{Ast, Expr, ExprId, Stmt, StmtId};

pub trait Visitor {
    fn visit_body(&mut self, ast: &Ast, body: &[StmtId]) {
        walk_body(self, ast, body);
    }

    fn visit_stmt(&mut self, ast: &Ast, stmt: StmtId) {
        walk_stmt(self, ast, stmt);
    }

    fn visit_expr(&mut self, ast: &Ast, expr: ExprId) {
        walk_expr(self, ast, expr);
    }
}

pub fn walk_body<V: Visitor + ?Sized>(visitor: &mut V, ast: &Ast, body: &[StmtId]) {
    for &stmt in body {
        visitor.visit_stmt(ast, stmt);
    }
}

pub fn walk_stmt<V: Visitor + ?Sized>(visitor: &mut V, ast: &Ast, stmt: StmtId) {
    match &ast[stmt] {
        Stmt::FunctionDef(function_def) => {
            for &decorator in &function_def.decorator_list {
                visitor.visit_expr(ast, decorator);
            }
            for parameter in function_def.parameters.iter() {
                if let Some(annotation) = parameter.annotation {
                    visitor.visit_expr(ast, annotation);
                }
                if let Some(default) = parameter.default {
                    visitor.visit_expr(ast, default);
                }
            }
            if let Some(returns) = function_def.returns {
                visitor.visit_expr(ast, returns);
            }
            visitor.visit_body(ast, &function_def.body);
        }
        Stmt::ClassDef(class_def) => {
            for &decorator in &class_def.decorator_list {
                visitor.visit_expr(ast, decorator);
            }
            for &base in &class_def.bases {
                visitor.visit_expr(ast, base);
            }
            for keyword in &class_def.keywords {
                visitor.visit_expr(ast, keyword.value);
            }
            visitor.visit_body(ast, &class_def.body);
        }
        Stmt::Assign(assign) => {
            for &target in &assign.targets {
                visitor.visit_expr(ast, target);
            }
            visitor.visit_expr(ast, assign.value);
        }
        Stmt::AnnAssign(ann_assign) => {
            visitor.visit_expr(ast, ann_assign.target);
            visitor.visit_expr(ast, ann_assign.annotation);
            if let Some(value) = ann_assign.value {
                visitor.visit_expr(ast, value);
            }
        }
        Stmt::AugAssign(aug_assign) => {
            visitor.visit_expr(ast, aug_assign.target);
            visitor.visit_expr(ast, aug_assign.value);
        }
        Stmt::For(for_stmt) => {
            visitor.visit_expr(ast, for_stmt.target);
            visitor.visit_expr(ast, for_stmt.iter);
            visitor.visit_body(ast, &for_stmt.body);
            visitor.visit_body(ast, &for_stmt.orelse);
        }
        Stmt::While(while_stmt) => {
            visitor.visit_expr(ast, while_stmt.test);
            visitor.visit_body(ast, &while_stmt.body);
            visitor.visit_body(ast, &while_stmt.orelse);
        }
        Stmt::If(if_stmt) => {
            visitor.visit_expr(ast, if_stmt.test);
            visitor.visit_body(ast, &if_stmt.body);
            visitor.visit_body(ast, &if_stmt.orelse);
        }
        Stmt::With(with_stmt) => {
            for item in &with_stmt.items {
                visitor.visit_expr(ast, item.context_expr);
                if let Some(optional_vars) = item.optional_vars {
                    visitor.visit_expr(ast, optional_vars);
                }
            }
            visitor.visit_body(ast, &with_stmt.body);
        }
        Stmt::Try(try_stmt) => {
            visitor.visit_body(ast, &try_stmt.body);
            for handler in &try_stmt.handlers {
                if let Some(type_) = handler.type_ {
                    visitor.visit_expr(ast, type_);
                }
                if let Some(name) = handler.name {
                    visitor.visit_expr(ast, name);
                }
                visitor.visit_body(ast, &handler.body);
            }
            visitor.visit_body(ast, &try_stmt.orelse);
            visitor.visit_body(ast, &try_stmt.finalbody);
        }
        Stmt::Raise(raise) => {
            if let Some(exc) = raise.exc {
                visitor.visit_expr(ast, exc);
            }
            if let Some(cause) = raise.cause {
                visitor.visit_expr(ast, cause);
            }
        }
        Stmt::TypeAlias(type_alias) => {
            if let Some(type_params) = &type_alias.type_params {
                for param in &type_params.params {
                    if let crate::TypeParam::TypeVar(type_var) = param {
                        if let Some(bound) = type_var.bound {
                            visitor.visit_expr(ast, bound);
                        }
                    }
                }
            }
            visitor.visit_expr(ast, type_alias.value);
        }
        Stmt::Return(return_stmt) => {
            if let Some(value) = return_stmt.value {
                visitor.visit_expr(ast, value);
            }
        }
        Stmt::Delete(delete) => {
            for &target in &delete.targets {
                visitor.visit_expr(ast, target);
            }
        }
        Stmt::Expr(expr_stmt) => {
            visitor.visit_expr(ast, expr_stmt.value);
        }
        Stmt::Import(_)
        | Stmt::ImportFrom(_)
        | Stmt::Global(_)
        | Stmt::Nonlocal(_)
        | Stmt::Pass
        | Stmt::Break
        | Stmt::Continue => {}
    }
}

pub fn walk_expr<V: Visitor + ?Sized>(visitor: &mut V, ast: &Ast, expr: ExprId) {
    match &ast[expr] {
        Expr::Attribute(attribute) => {
            visitor.visit_expr(ast, attribute.value);
        }
        Expr::Call(call) => {
            visitor.visit_expr(ast, call.func);
            for &arg in &call.args {
                visitor.visit_expr(ast, arg);
            }
            for keyword in &call.keywords {
                visitor.visit_expr(ast, keyword.value);
            }
        }
        Expr::Tuple(tuple) => {
            for &elt in &tuple.elts {
                visitor.visit_expr(ast, elt);
            }
        }
        Expr::List(list) => {
            for &elt in &list.elts {
                visitor.visit_expr(ast, elt);
            }
        }
        Expr::Set(set) => {
            for &elt in &set.elts {
                visitor.visit_expr(ast, elt);
            }
        }
        Expr::Dict(dict) => {
            for item in &dict.items {
                if let Some(key) = item.key {
                    visitor.visit_expr(ast, key);
                }
                visitor.visit_expr(ast, item.value);
            }
        }
        Expr::Subscript(subscript) => {
            visitor.visit_expr(ast, subscript.value);
            visitor.visit_expr(ast, subscript.slice);
        }
        Expr::Starred(starred) => {
            visitor.visit_expr(ast, starred.value);
        }
        Expr::Lambda(lambda) => {
            for parameter in lambda.parameters.iter() {
                if let Some(default) = parameter.default {
                    visitor.visit_expr(ast, default);
                }
            }
            visitor.visit_expr(ast, lambda.body);
        }
        Expr::ListComp(comp) => {
            visitor.visit_expr(ast, comp.elt);
            walk_comprehensions(visitor, ast, &comp.generators);
        }
        Expr::SetComp(comp) => {
            visitor.visit_expr(ast, comp.elt);
            walk_comprehensions(visitor, ast, &comp.generators);
        }
        Expr::DictComp(comp) => {
            visitor.visit_expr(ast, comp.key);
            visitor.visit_expr(ast, comp.value);
            walk_comprehensions(visitor, ast, &comp.generators);
        }
        Expr::Generator(comp) => {
            visitor.visit_expr(ast, comp.elt);
            walk_comprehensions(visitor, ast, &comp.generators);
        }
        Expr::Named(named) => {
            visitor.visit_expr(ast, named.target);
            visitor.visit_expr(ast, named.value);
        }
        Expr::BinOp(bin_op) => {
            visitor.visit_expr(ast, bin_op.left);
            visitor.visit_expr(ast, bin_op.right);
        }
        Expr::UnaryOp(unary_op) => {
            visitor.visit_expr(ast, unary_op.operand);
        }
        Expr::BoolOp(bool_op) => {
            for &value in &bool_op.values {
                visitor.visit_expr(ast, value);
            }
        }
        Expr::Compare(compare) => {
            visitor.visit_expr(ast, compare.left);
            for &comparator in &compare.comparators {
                visitor.visit_expr(ast, comparator);
            }
        }
        Expr::If(if_expr) => {
            visitor.visit_expr(ast, if_expr.body);
            visitor.visit_expr(ast, if_expr.test);
            visitor.visit_expr(ast, if_expr.orelse);
        }
        Expr::Name(_)
        | Expr::StringLiteral(_)
        | Expr::NumberLiteral(_)
        | Expr::BooleanLiteral(_)
        | Expr::NoneLiteral => {}
    }
}

fn walk_comprehensions<V: Visitor + ?Sized>(
    visitor: &mut V,
    ast: &Ast,
    generators: &[crate::Comprehension],
) {
    for comprehension in generators {
        visitor.visit_expr(ast, comprehension.target);
        visitor.visit_expr(ast, comprehension.iter);
        for &condition in &comprehension.ifs {
            visitor.visit_expr(ast, condition);
        }
    }
}
