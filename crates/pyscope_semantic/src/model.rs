use std::ops::Index;

use pyscope_ast::{helpers, Ast, ExprId, NodeKey, Stmt, StmtId};
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::access::{Access, AccessId, Accesses};
use crate::assignment::{Assignment, AssignmentId, AssignmentKind, Assignments};
use crate::error::ScopeError;
use crate::qualified_name::{import_qualified_names, join_prefix, QualifiedName};
use crate::scope::{Scope, ScopeId, ScopeKind, Scopes};

/// The resolved name graph of one module: its scopes, assignments and
/// accesses, plus per-node lookup tables. Built by [`crate::analyze`];
/// read-only afterwards.
#[derive(Debug)]
pub struct SemanticModel<'a> {
    pub(crate) ast: &'a Ast,
    pub(crate) scopes: Scopes<'a>,
    pub(crate) assignments: Assignments<'a>,
    pub(crate) accesses: Accesses,
    pub(crate) scope_by_node: FxHashMap<NodeKey, ScopeId>,
    pub(crate) accesses_by_node: FxHashMap<ExprId, SmallVec<[AccessId; 1]>>,
    builtin_names: FxHashSet<&'a str>,
}

impl<'a> SemanticModel<'a> {
    pub(crate) fn new(ast: &'a Ast, builtins: &'a [&'a str]) -> Self {
        Self {
            ast,
            scopes: Scopes::default(),
            assignments: Assignments::default(),
            accesses: Accesses::default(),
            scope_by_node: FxHashMap::default(),
            accesses_by_node: FxHashMap::default(),
            builtin_names: builtins.iter().copied().collect(),
        }
    }

    pub fn ast(&self) -> &'a Ast {
        self.ast
    }

    /// The scope a node was visited in, or `None` for nodes outside the
    /// analyzed tree.
    pub fn scope_of(&self, node: impl Into<NodeKey>) -> Option<ScopeId> {
        self.scope_by_node.get(&node.into()).copied()
    }

    /// The scope ids of the program, in creation order.
    pub fn scope_ids(&self) -> impl Iterator<Item = ScopeId> + '_ {
        self.scopes.indices()
    }

    /// All ancestors of `scope`, starting from `scope` itself and ending at
    /// the builtin root.
    pub fn ancestor_ids(&self, scope: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        self.scopes.ancestor_ids(scope)
    }

    /// The assignments recorded directly in `scope`.
    pub fn assignments_in(&self, scope: ScopeId) -> impl Iterator<Item = AssignmentId> + '_ {
        self.scopes[scope].assignment_ids()
    }

    /// The accesses recorded in `scope`.
    pub fn accesses_in(&self, scope: ScopeId) -> impl Iterator<Item = AccessId> + '_ {
        self.scopes[scope].access_ids()
    }

    /// The accesses attributed to an expression. Usually zero or one; a
    /// dotted chain accrues one per resolved prefix access.
    pub fn accesses_of(&self, node: ExprId) -> &[AccessId] {
        self.accesses_by_node
            .get(&node)
            .map_or(&[], SmallVec::as_slice)
    }

    /// Returns `true` if `name` resolves to anything visible from `scope`,
    /// walking the ancestor chain and ending at the builtin namespace.
    pub fn scope_contains(&self, scope: ScopeId, name: &str) -> bool {
        let mut current = scope;
        loop {
            if self.scopes[current].kind.is_builtin() {
                return !self.scopes[current].get(name).is_empty()
                    || self.builtin_names.contains(name);
            }
            if let Some(&target) = self.scopes[current].overwrites.get(name) {
                current = target;
                continue;
            }
            if self.scopes[current].has(name) {
                return true;
            }
            match self.scopes[current].parent {
                Some(parent) => current = self.next_visible_parent(current, parent),
                None => return false,
            }
        }
    }

    /// All qualified names of a node.
    ///
    /// An expression carrying resolved accesses takes its names from the
    /// linked assignments. Otherwise the node's dotted full name is matched
    /// against visible assignments, longest prefix first; an assignment
    /// performed by the queried node itself wins outright.
    pub fn qualified_names_of(&self, node: impl Into<NodeKey>) -> Vec<QualifiedName> {
        let key = node.into();
        if let NodeKey::Expr(expr) = key {
            let accesses = self.accesses_of(expr);
            if !accesses.is_empty() {
                let mut results = Vec::new();
                for &access in accesses {
                    for &assignment in &self.accesses[access].assignments {
                        let name = self.assignments[assignment].name;
                        results.extend(self.assignment_qualified_names(assignment, name));
                    }
                }
                return dedup(results);
            }
        }

        let Some(scope) = self.scope_of(key) else {
            return Vec::new();
        };
        let Some(full_name) = self.full_name_of(key) else {
            return Vec::new();
        };
        self.qualified_names_in_scope(scope, &full_name, Some(key))
    }

    /// The qualified names `name` would have if written in `scope`.
    pub fn qualified_names_for_name(&self, scope: ScopeId, name: &str) -> Vec<QualifiedName> {
        self.qualified_names_in_scope(scope, name, None)
    }

    /// Mid-walk variant used while the model is still being built; the node
    /// may not carry scope metadata yet.
    pub(crate) fn qualified_names_of_expr_in(
        &self,
        scope: ScopeId,
        expr: ExprId,
    ) -> Vec<QualifiedName> {
        match helpers::full_name_for(self.ast, expr) {
            Some(full_name) => {
                self.qualified_names_in_scope(scope, &full_name, Some(NodeKey::Expr(expr)))
            }
            None => Vec::new(),
        }
    }

    fn qualified_names_in_scope(
        &self,
        scope: ScopeId,
        full_name: &str,
        node: Option<NodeKey>,
    ) -> Vec<QualifiedName> {
        // Match the longest visible dotted prefix of the name.
        let mut prefix = full_name;
        let (assignments, unmaterialized_builtin) = loop {
            if self.scope_contains(scope, prefix) {
                break self.resolve_query(scope, prefix);
            }
            match prefix.rfind('.') {
                Some(dot) => prefix = &prefix[..dot],
                None => return Vec::new(),
            }
        };

        if unmaterialized_builtin {
            return vec![QualifiedName::builtin(prefix)];
        }

        // An assignment performed by the queried node shadows the union.
        if let Some(node) = node {
            for &assignment in &assignments {
                if self.assignments[assignment].node() == Some(node) {
                    return dedup(self.assignment_qualified_names(assignment, full_name));
                }
            }
        }

        let mut results = Vec::new();
        for &assignment in &assignments {
            results.extend(self.assignment_qualified_names(assignment, full_name));
        }
        dedup(results)
    }

    /// The qualified names `assignment` gives to `full_name`, a dotted
    /// extension of the assigned name.
    fn assignment_qualified_names(
        &self,
        assignment: AssignmentId,
        full_name: &str,
    ) -> Vec<QualifiedName> {
        let assignment = &self.assignments[assignment];
        match &assignment.kind {
            AssignmentKind::Plain { .. } => {
                let prefix = &self.scopes[assignment.scope].qualified_prefix;
                vec![QualifiedName::local(join_prefix(prefix, full_name))]
            }
            AssignmentKind::Import(import) => {
                import_qualified_names(self.ast, import.stmt, full_name)
            }
            AssignmentKind::Builtin => vec![QualifiedName::builtin(assignment.name)],
        }
    }

    fn full_name_of(&self, key: NodeKey) -> Option<String> {
        match key {
            NodeKey::Expr(expr) => helpers::full_name_for(self.ast, expr),
            NodeKey::Stmt(stmt) => match &self.ast[stmt] {
                Stmt::FunctionDef(def) => Some(def.name.to_string()),
                Stmt::ClassDef(def) => Some(def.name.to_string()),
                Stmt::TypeAlias(alias) => Some(alias.name.to_string()),
                _ => None,
            },
        }
    }

    // ------------------------------------------------------------------
    // Resolution internals, shared by the builder and the deferred pass.
    // ------------------------------------------------------------------

    /// Resolves `name` starting at `scope`, materializing and memoizing a
    /// builtin assignment if the walk bottoms out on a known builtin.
    ///
    /// `from_scope` is the scope the access occurs in; it controls class-body
    /// opacity and never changes while the ancestor chain is walked.
    pub(crate) fn resolve_name(
        &mut self,
        scope: ScopeId,
        name: &str,
        from_scope: ScopeId,
    ) -> SmallVec<[AssignmentId; 2]> {
        let mut current = scope;
        loop {
            if self.scopes[current].kind.is_builtin() {
                if let Some(existing) = self.scopes[current].assignments.get(name) {
                    return existing.iter().copied().collect();
                }
                let Some(&stored) = self.builtin_names.get(name) else {
                    return SmallVec::new();
                };
                let id = self.assignments.push(Assignment::builtin(stored));
                self.scopes[current]
                    .assignments
                    .entry(stored)
                    .or_default()
                    .push(id);
                return SmallVec::from_iter([id]);
            }
            if let Some(&target) = self.scopes[current].overwrites.get(name) {
                current = self.next_visible_parent(from_scope, target);
                continue;
            }
            if let Some(existing) = self.scopes[current].assignments.get(name) {
                return existing.iter().copied().collect();
            }
            match self.scopes[current].parent {
                Some(parent) => current = self.next_visible_parent(from_scope, parent),
                None => return SmallVec::new(),
            }
        }
    }

    /// Read-only sibling of [`Self::resolve_name`]. The second return is
    /// `true` when the name is a builtin whose assignment has not been
    /// materialized yet.
    fn resolve_query(&self, scope: ScopeId, name: &str) -> (SmallVec<[AssignmentId; 2]>, bool) {
        let mut current = scope;
        loop {
            if self.scopes[current].kind.is_builtin() {
                let existing = self.scopes[current].get(name);
                if !existing.is_empty() {
                    return (existing.iter().copied().collect(), false);
                }
                return (SmallVec::new(), self.builtin_names.contains(name));
            }
            if let Some(&target) = self.scopes[current].overwrites.get(name) {
                current = self.next_visible_parent(scope, target);
                continue;
            }
            if self.scopes[current].has(name) {
                return (self.scopes[current].get(name).iter().copied().collect(), false);
            }
            match self.scopes[current].parent {
                Some(parent) => current = self.next_visible_parent(scope, parent),
                None => return (SmallVec::new(), false),
            }
        }
    }

    /// Skips scopes not visible from `from_scope`. A class body is opaque to
    /// nested scopes, except to annotation scopes attached directly to it.
    pub(crate) fn next_visible_parent(&self, from_scope: ScopeId, mut scope: ScopeId) -> ScopeId {
        while !self.is_visible_from(scope, from_scope) {
            match self.scopes[scope].parent {
                Some(parent) => scope = parent,
                None => break,
            }
        }
        scope
    }

    fn is_visible_from(&self, scope: ScopeId, from_scope: ScopeId) -> bool {
        match self.scopes[scope].kind {
            ScopeKind::Class => {
                self.scopes[from_scope].parent == Some(scope)
                    && self.scopes[from_scope].kind.is_annotation()
            }
            _ => true,
        }
    }

    /// The scope an assignment of `name` made in `scope` lands in, following
    /// global/nonlocal redirects.
    fn find_assignment_target(&self, scope: ScopeId, name: &str) -> ScopeId {
        let mut current = scope;
        while let Some(&target) = self.scopes[current].overwrites.get(name) {
            current = self.next_visible_parent(current, target);
        }
        current
    }

    // ------------------------------------------------------------------
    // Recording, used by the builder.
    // ------------------------------------------------------------------

    pub(crate) fn push_scope(
        &mut self,
        kind: ScopeKind,
        parent: ScopeId,
        node: NodeKey,
        name: Option<&'a str>,
    ) -> ScopeId {
        self.scopes.push_scope(kind, parent, node, name)
    }

    pub(crate) fn record_assignment(&mut self, scope: ScopeId, name: &'a str, node: NodeKey) {
        self.record(scope, name, AssignmentKind::Plain { node });
    }

    pub(crate) fn record_import_assignment(
        &mut self,
        scope: ScopeId,
        name: &'a str,
        stmt: StmtId,
        alias: usize,
    ) {
        self.record(
            scope,
            name,
            AssignmentKind::Import(crate::assignment::ImportAssignment { stmt, alias }),
        );
    }

    fn record(&mut self, scope: ScopeId, name: &'a str, kind: AssignmentKind) {
        let target = self.find_assignment_target(scope, name);
        let index = self.scopes[target].assignment_count;
        tracing::trace!(name, ?target, index, "recording assignment");
        let id = self
            .assignments
            .push(Assignment::new(name, target, kind, index));
        self.scopes[target]
            .assignments
            .entry(name)
            .or_default()
            .push(id);
    }

    /// Installs a `global` redirect. A no-op at module level, where the name
    /// already lives in the global scope.
    pub(crate) fn record_global_overwrite(&mut self, scope: ScopeId, name: &'a str) {
        if scope.is_global() {
            return;
        }
        self.scopes[scope].overwrites.insert(name, ScopeId::global());
    }

    /// Installs a `nonlocal` redirect to the immediately enclosing scope.
    pub(crate) fn record_nonlocal_overwrite(
        &mut self,
        scope: ScopeId,
        name: &'a str,
        node: StmtId,
    ) -> Result<(), ScopeError> {
        if scope.is_global() || scope.is_builtin() {
            return Err(ScopeError::NonlocalAtModuleLevel {
                name: name.to_string(),
                node,
            });
        }
        // Pushed scopes always have a parent.
        if let Some(parent) = self.scopes[scope].parent {
            self.scopes[scope].overwrites.insert(name, parent);
        }
        Ok(())
    }

    pub(crate) fn bump_assignment_count(&mut self, scope: ScopeId) {
        self.scopes[scope].assignment_count += 1;
    }

    pub(crate) fn set_scope_of(&mut self, node: NodeKey, scope: ScopeId) {
        self.scope_by_node.insert(node, scope);
    }

    pub(crate) fn push_access(&mut self, access: Access) -> AccessId {
        self.accesses.push(access)
    }
}

impl<'a> Index<ScopeId> for SemanticModel<'a> {
    type Output = Scope<'a>;

    fn index(&self, id: ScopeId) -> &Scope<'a> {
        &self.scopes[id]
    }
}

impl<'a> Index<AssignmentId> for SemanticModel<'a> {
    type Output = Assignment<'a>;

    fn index(&self, id: AssignmentId) -> &Assignment<'a> {
        &self.assignments[id]
    }
}

impl Index<AccessId> for SemanticModel<'_> {
    type Output = Access;

    fn index(&self, id: AccessId) -> &Access {
        &self.accesses[id]
    }
}

fn dedup(mut results: Vec<QualifiedName>) -> Vec<QualifiedName> {
    results.sort();
    results.dedup();
    results
}
