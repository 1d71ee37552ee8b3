//! Dotted-name helpers for attribute chains like `a.b.c`.

use crate::{Ast, Expr, ExprId};

/// Returns the full dotted name of an expression, if it has one.
///
/// `a` yields `"a"`, `a.b.c` yields `"a.b.c"`, and a call delegates to its
/// callee (`a.b()` yields `"a.b"`). Anything else yields `None`.
pub fn full_name_for(ast: &Ast, expr: ExprId) -> Option<String> {
    match &ast[expr] {
        Expr::Name(name) => Some(name.id.to_string()),
        Expr::Attribute(attr) => {
            let value = full_name_for(ast, attr.value)?;
            Some(format!("{value}.{}", attr.attr))
        }
        Expr::Call(call) => full_name_for(ast, call.func),
        _ => None,
    }
}

/// Returns every dotted prefix of an attribute chain, longest first, paired
/// with the node covering that prefix.
///
/// `a.b.c` yields `[("a.b.c", c-node), ("a.b", b-node), ("a", a-node)]`. A
/// call inside the chain truncates it: `a.b().c` yields only the prefixes of
/// `a.b`, since the call's result is not a name.
pub fn dotted_prefixes(ast: &Ast, expr: ExprId) -> Vec<(String, ExprId)> {
    match &ast[expr] {
        Expr::Name(name) => vec![(name.id.to_string(), expr)],
        Expr::Attribute(attr) => match &ast[attr.value] {
            Expr::Call(call) => match &ast[call.func] {
                Expr::Name(_) | Expr::Attribute(_) => dotted_prefixes(ast, call.func),
                _ => Vec::new(),
            },
            Expr::Name(_) | Expr::Attribute(_) => {
                let inner = dotted_prefixes(ast, attr.value);
                match inner.first() {
                    Some((base, _)) => {
                        let mut prefixes = vec![(format!("{base}.{}", attr.attr), expr)];
                        prefixes.extend(inner);
                        prefixes
                    }
                    None => Vec::new(),
                }
            }
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}
