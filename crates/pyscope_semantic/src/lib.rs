//! Static name resolution for `pyscope_ast` trees.
//!
//! [`analyze`] walks a module once, building the lexical scope hierarchy and
//! recording every assignment and access, then runs a single deferred
//! resolution pass linking each access to the set of assignments that could
//! define it. The resulting [`SemanticModel`] answers scope, assignment,
//! access and qualified-name queries; it is read-only once returned.

mod access;
mod assignment;
mod builder;
pub mod builtins;
mod error;
mod model;
mod qualified_name;
mod resolve;
mod scope;

pub use access::{Access, AccessFlags, AccessId};
pub use assignment::{Assignment, AssignmentId, AssignmentKind, ImportAssignment};
pub use builder::{analyze, analyze_with_builtins};
pub use error::ScopeError;
pub use model::SemanticModel;
pub use qualified_name::{QualifiedName, QualifiedNameSource};
pub use scope::{Scope, ScopeId, ScopeKind};
