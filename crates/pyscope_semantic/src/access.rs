use std::ops::{Deref, DerefMut};

use bitflags::bitflags;
use pyscope_ast::ExprId;
use pyscope_index::{newtype_index, IndexSlice, IndexVec};
use smallvec::SmallVec;

use crate::assignment::AssignmentId;
use crate::scope::ScopeId;

newtype_index! {
    /// Id uniquely identifying an access in a program.
    pub struct AccessId;
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AccessFlags: u8 {
        /// The access sits inside an annotation position.
        const ANNOTATION = 1 << 0;
        /// The access sits inside a type-hint context introduced by a
        /// `typing` helper or subscript.
        const TYPE_HINT = 1 << 1;
    }
}

/// One read (or delete) of a name, linked after resolution to the
/// assignments that could define it.
#[derive(Debug)]
pub struct Access {
    /// The referencing expression. Initially the bare name node; the
    /// resolution pass may re-attribute it to an enclosing attribute chain
    /// or to the string literal an annotation was parsed from.
    pub(crate) node: ExprId,

    /// The possibly dotted name being read.
    pub(crate) name: String,

    /// The scope the access occurs in.
    pub scope: ScopeId,

    pub flags: AccessFlags,

    /// Snapshot of the scope's assignment counter at creation; assignments
    /// in the same scope with an equal or larger index come later.
    pub(crate) index: u32,

    pub(crate) assignments: SmallVec<[AssignmentId; 2]>,
}

impl Access {
    /// The expression this access is attributed to.
    pub fn node(&self) -> ExprId {
        self.node
    }

    /// The name being read, dotted if the access was re-attributed to an
    /// attribute chain.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_annotation(&self) -> bool {
        self.flags.contains(AccessFlags::ANNOTATION)
    }

    pub fn is_type_hint(&self) -> bool {
        self.flags.contains(AccessFlags::TYPE_HINT)
    }

    /// The assignments that could define this access. Empty for unresolved
    /// names.
    pub fn assignments(&self) -> &[AssignmentId] {
        &self.assignments
    }
}

/// The accesses of a program, indexed by [`AccessId`].
#[derive(Debug, Default)]
pub(crate) struct Accesses(IndexVec<AccessId, Access>);

impl Accesses {
    pub(crate) fn push(&mut self, access: Access) -> AccessId {
        self.0.push(access)
    }
}

impl Deref for Accesses {
    type Target = IndexSlice<AccessId, Access>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Accesses {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// An access whose resolution is deferred to the end of the walk, with the
/// context captured at creation.
#[derive(Debug)]
pub(crate) struct DeferredAccess {
    pub(crate) access: AccessId,
    /// Outermost attribute chain the name sat in, for dotted re-attribution.
    pub(crate) enclosing_attribute: Option<ExprId>,
    /// Outermost string literal the name was parsed out of, if any.
    pub(crate) enclosing_string_annotation: Option<ExprId>,
}
