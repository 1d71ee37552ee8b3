use std::ops::{Deref, DerefMut};

use pyscope_ast::{NodeKey, StmtId};
use pyscope_index::{newtype_index, IndexSlice, IndexVec};

use crate::access::AccessId;
use crate::scope::ScopeId;

newtype_index! {
    /// Id uniquely identifying an assignment in a program.
    pub struct AssignmentId;
}

/// One recorded definition of a name in a scope.
#[derive(Debug)]
pub struct Assignment<'a> {
    /// The name being defined. Import assignments of dotted modules record
    /// one assignment per dotted prefix (`import a.b` defines both `a.b`
    /// and `a`).
    pub name: &'a str,

    /// The scope the assignment was recorded in, after any global/nonlocal
    /// redirect.
    pub scope: ScopeId,

    pub kind: AssignmentKind,

    /// Snapshot of the owning scope's assignment counter at creation, or
    /// `None` for builtins, which precede everything.
    pub(crate) index: Option<u32>,

    /// Accesses this assignment may define (populated by the resolution
    /// pass).
    pub(crate) accesses: Vec<AccessId>,
}

#[derive(Debug, Clone, PartialEq, Eq, is_macro::Is)]
pub enum AssignmentKind {
    /// A binding written in source: an assignment target, a parameter, a
    /// definition, a loop or `with` target, an except-handler name, or a
    /// type parameter. `node` is the binding name expression where one
    /// exists, otherwise the owning statement or expression.
    Plain { node: NodeKey },
    /// A name bound by an `import` or `from ... import` statement.
    Import(ImportAssignment),
    /// A builtin, materialized lazily when first resolved against.
    Builtin,
}

/// The import statement and alias that bound a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportAssignment {
    pub stmt: StmtId,
    /// Position of the alias within the statement's `names` list.
    pub alias: usize,
}

impl<'a> Assignment<'a> {
    pub(crate) fn new(name: &'a str, scope: ScopeId, kind: AssignmentKind, index: u32) -> Self {
        Self {
            name,
            scope,
            kind,
            index: Some(index),
            accesses: Vec::new(),
        }
    }

    pub(crate) fn builtin(name: &'a str) -> Self {
        Self {
            name,
            scope: ScopeId::builtin(),
            kind: AssignmentKind::Builtin,
            index: None,
            accesses: Vec::new(),
        }
    }

    /// The node that performed the assignment, if it came from source.
    pub fn node(&self) -> Option<NodeKey> {
        match self.kind {
            AssignmentKind::Plain { node } => Some(node),
            AssignmentKind::Import(import) => Some(NodeKey::Stmt(import.stmt)),
            AssignmentKind::Builtin => None,
        }
    }

    /// The accesses this assignment may define.
    pub fn accesses(&self) -> &[AccessId] {
        &self.accesses
    }

    pub fn is_used(&self) -> bool {
        !self.accesses.is_empty()
    }

    /// Whether this assignment happens before an access with the given
    /// counter snapshot in the same scope. Builtins precede everything.
    pub(crate) fn precedes(&self, access_index: u32) -> bool {
        self.index.map_or(true, |index| index < access_index)
    }
}

/// The assignments of a program, indexed by [`AssignmentId`].
#[derive(Debug, Default)]
pub(crate) struct Assignments<'a>(IndexVec<AssignmentId, Assignment<'a>>);

impl<'a> Assignments<'a> {
    pub(crate) fn push(&mut self, assignment: Assignment<'a>) -> AssignmentId {
        self.0.push(assignment)
    }
}

impl<'a> Deref for Assignments<'a> {
    type Target = IndexSlice<AssignmentId, Assignment<'a>>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Assignments<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}
