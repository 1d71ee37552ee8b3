//! Arena-allocated syntax tree for a Python-like language.
//!
//! There is no parser here: trees are built programmatically (see the
//! construction helpers on [`Ast`]) and handed to consumers such as
//! `pyscope_semantic`. Node identity is positional: every statement and
//! expression lives in an [`Ast`]-owned arena and is referred to by
//! [`StmtId`]/[`ExprId`], so side tables never need pointers into the tree.

pub use nodes::*;

pub mod helpers;
mod nodes;
pub mod visitor;
