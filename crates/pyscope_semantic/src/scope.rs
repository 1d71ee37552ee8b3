use std::ops::{Deref, DerefMut};

use pyscope_ast::NodeKey;
use pyscope_index::{newtype_index, IndexSlice, IndexVec};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::access::AccessId;
use crate::assignment::AssignmentId;

newtype_index! {
    /// Id uniquely identifying a scope in a program.
    pub struct ScopeId;
}

impl ScopeId {
    /// The synthetic builtin scope at the root of every scope tree.
    #[inline]
    pub const fn builtin() -> Self {
        ScopeId::from_u32(0)
    }

    /// The module (global) scope.
    #[inline]
    pub const fn global() -> Self {
        ScopeId::from_u32(1)
    }

    pub const fn is_builtin(self) -> bool {
        self.as_u32() == 0
    }

    pub const fn is_global(self) -> bool {
        self.as_u32() == 1
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, is_macro::Is)]
pub enum ScopeKind {
    /// The synthetic root holding lazily materialized builtin assignments.
    Builtin,
    /// The module (global) scope.
    Module,
    /// A function or lambda body.
    Function,
    /// A class body. Opaque to nested scopes except its own directly
    /// attached annotation scopes.
    Class,
    /// A comprehension or generator expression.
    Comprehension,
    /// A type-parameter or type-alias region.
    Annotation,
}

/// One lexical region and the names recorded in it.
#[derive(Debug)]
pub struct Scope<'a> {
    pub kind: ScopeKind,

    /// The parent scope. `None` only for the builtin root; the global scope's
    /// parent is the builtin scope.
    pub parent: Option<ScopeId>,

    /// The node that introduced this scope, if any.
    pub node: Option<NodeKey>,

    /// The declared name of a function or class scope, used for qualified
    /// names. Lambdas, comprehensions and annotation scopes are anonymous.
    pub(crate) name: Option<&'a str>,

    /// Dotted qualified-name prefix for names declared here, e.g.
    /// `outer.<locals>` inside `def outer`.
    pub(crate) qualified_prefix: String,

    /// Bumped once per binding-capable construct, after its children; an
    /// assignment or access records the value current at its creation, giving
    /// the temporal order used by the resolution pass.
    pub(crate) assignment_count: u32,

    pub(crate) assignments: FxHashMap<&'a str, SmallVec<[AssignmentId; 1]>>,
    pub(crate) accesses: FxHashMap<String, SmallVec<[AccessId; 1]>>,

    /// Per-name redirects installed by global/nonlocal declarations: later
    /// assignments to the name are recorded in the target scope instead.
    pub(crate) overwrites: FxHashMap<&'a str, ScopeId>,
}

impl<'a> Scope<'a> {
    pub(crate) fn builtin() -> Self {
        Self::raw(ScopeKind::Builtin, None, None, None, String::new())
    }

    pub(crate) fn module() -> Self {
        Self::raw(
            ScopeKind::Module,
            Some(ScopeId::builtin()),
            None,
            None,
            String::new(),
        )
    }

    pub(crate) fn local(
        kind: ScopeKind,
        parent: ScopeId,
        node: NodeKey,
        name: Option<&'a str>,
        parent_prefix: &str,
    ) -> Self {
        let prefix = make_prefix(kind, parent_prefix, name);
        Self::raw(kind, Some(parent), Some(node), name, prefix)
    }

    fn raw(
        kind: ScopeKind,
        parent: Option<ScopeId>,
        node: Option<NodeKey>,
        name: Option<&'a str>,
        qualified_prefix: String,
    ) -> Self {
        Self {
            kind,
            parent,
            node,
            name,
            qualified_prefix,
            assignment_count: 0,
            assignments: FxHashMap::default(),
            accesses: FxHashMap::default(),
            overwrites: FxHashMap::default(),
        }
    }

    /// The declared name of this scope, if it has one.
    pub fn name(&self) -> Option<&'a str> {
        self.name
    }

    /// The assignments recorded directly in this scope under `name`.
    pub fn get(&self, name: &str) -> &[AssignmentId] {
        self.assignments.get(name).map_or(&[], SmallVec::as_slice)
    }

    /// Returns `true` if this scope directly records an assignment of `name`.
    pub fn has(&self, name: &str) -> bool {
        !self.get(name).is_empty()
    }

    /// All assignments recorded directly in this scope.
    pub fn assignment_ids(&self) -> impl Iterator<Item = AssignmentId> + '_ {
        self.assignments.values().flatten().copied()
    }

    /// All accesses recorded in this scope (populated by the resolution pass).
    pub fn access_ids(&self) -> impl Iterator<Item = AccessId> + '_ {
        self.accesses.values().flatten().copied()
    }

    /// The accesses recorded in this scope under `name`.
    pub fn accesses_named(&self, name: &str) -> &[AccessId] {
        self.accesses.get(name).map_or(&[], SmallVec::as_slice)
    }
}

/// The qualified-name prefix of a scope: functions contribute
/// `name.<locals>`, classes their bare name, comprehensions a
/// `<comprehension>` marker; annotation scopes are transparent.
fn make_prefix(kind: ScopeKind, parent_prefix: &str, name: Option<&str>) -> String {
    let segments: &[Option<&str>] = match kind {
        ScopeKind::Function => &[name, Some("<locals>")],
        ScopeKind::Class => &[name],
        ScopeKind::Comprehension => &[Some("<comprehension>")],
        ScopeKind::Annotation | ScopeKind::Module | ScopeKind::Builtin => &[],
    };
    let mut prefix = parent_prefix.to_string();
    for segment in segments.iter().flatten() {
        if !prefix.is_empty() {
            prefix.push('.');
        }
        prefix.push_str(segment);
    }
    prefix
}

/// The scopes of a program, indexed by [`ScopeId`]. Seeded with the builtin
/// root and the module scope.
#[derive(Debug)]
pub(crate) struct Scopes<'a>(IndexVec<ScopeId, Scope<'a>>);

impl<'a> Scopes<'a> {
    pub(crate) fn push_scope(
        &mut self,
        kind: ScopeKind,
        parent: ScopeId,
        node: NodeKey,
        name: Option<&'a str>,
    ) -> ScopeId {
        let parent_prefix = self.0[parent].qualified_prefix.clone();
        self.0
            .push(Scope::local(kind, parent, node, name, &parent_prefix))
    }

    /// All [`ScopeId`] ancestors, starting from `scope` itself.
    pub(crate) fn ancestor_ids(&self, scope: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(scope), |&scope| self[scope].parent)
    }
}

impl Default for Scopes<'_> {
    fn default() -> Self {
        Self(IndexVec::from_raw(vec![Scope::builtin(), Scope::module()]))
    }
}

impl<'a> Deref for Scopes<'a> {
    type Target = IndexSlice<ScopeId, Scope<'a>>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Scopes<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_roots() {
        let scopes = Scopes::default();
        assert!(scopes[ScopeId::builtin()].kind.is_builtin());
        assert!(scopes[ScopeId::global()].kind.is_module());
        assert_eq!(scopes[ScopeId::global()].parent, Some(ScopeId::builtin()));
        assert_eq!(scopes[ScopeId::builtin()].parent, None);
    }

    #[test]
    fn prefixes() {
        assert_eq!(make_prefix(ScopeKind::Function, "", Some("f")), "f.<locals>");
        assert_eq!(
            make_prefix(ScopeKind::Function, "f.<locals>", None),
            "f.<locals>.<locals>"
        );
        assert_eq!(make_prefix(ScopeKind::Class, "", Some("C")), "C");
        assert_eq!(
            make_prefix(ScopeKind::Comprehension, "C.f.<locals>", None),
            "C.f.<locals>.<comprehension>"
        );
        assert_eq!(make_prefix(ScopeKind::Annotation, "C", None), "C");
    }
}
