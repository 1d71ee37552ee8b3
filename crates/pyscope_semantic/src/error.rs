use pyscope_ast::StmtId;
use thiserror::Error;

/// A configuration error in the input tree: the construct is only legal in a
/// position the tree does not provide. Unresolvable names are *not* errors;
/// they resolve to an empty assignment set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    /// A `nonlocal` declaration at module level: there is no enclosing
    /// function scope its names could redirect to.
    #[error("nonlocal declaration of `{name}` at module level (statement {node:?})")]
    NonlocalAtModuleLevel { name: String, node: StmtId },
}
