//! The deferred resolution pass.
//!
//! Runs once after the walk. Each queued access is re-attributed to the
//! longest resolvable prefix of its enclosing attribute chain (or to the
//! string literal it was parsed from), linked to the assignments that could
//! define it, and recorded on those assignments in turn.

use pyscope_ast::helpers;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::access::{AccessId, DeferredAccess};
use crate::assignment::AssignmentId;
use crate::model::SemanticModel;
use crate::scope::ScopeId;

pub(crate) fn resolve_deferred(model: &mut SemanticModel<'_>, deferred: Vec<DeferredAccess>) {
    tracing::debug!(accesses = deferred.len(), "resolving deferred accesses");
    let mut grouped: FxHashMap<(ScopeId, String), Vec<AccessId>> = FxHashMap::default();

    for item in deferred {
        let access = item.access;
        let scope = model.accesses[access].scope;
        let mut name = model.accesses[access].name.clone();

        if let Some(attribute) = item.enclosing_attribute {
            // The longest prefix of the dotted chain that resolves wins; if
            // none does, the access stays on the bare name.
            for (prefix, node) in helpers::dotted_prefixes(model.ast, attribute) {
                if model.scope_contains(scope, &prefix) {
                    model.accesses[access].node = node;
                    name = prefix;
                    break;
                }
            }
        }
        if let Some(string_node) = item.enclosing_string_annotation {
            model.accesses[access].node = string_node;
        }
        model.accesses[access].name.clone_from(&name);

        link_assignments(model, access, &name);

        let node = model.accesses[access].node;
        model.scopes[scope]
            .accesses
            .entry(name.clone())
            .or_default()
            .push(access);
        model.accesses_by_node.entry(node).or_default().push(access);
        grouped.entry((scope, name)).or_default().push(access);
    }

    for ((scope, name), accesses) in grouped {
        let assignments = model.resolve_name(scope, &name, scope);
        for assignment in assignments {
            link_accesses(model, assignment, &accesses);
        }
    }
}

/// Links an access to the assignments that could define it: the resolved set
/// filtered down to assignments not later in the same scope. When the filter
/// empties a non-empty set, resolution retries one scope out, unfiltered:
/// in `x = x` inside a function, the right-hand side links to an `x` from
/// the enclosing scopes even though the local `x` shadows it.
fn link_assignments(model: &mut SemanticModel<'_>, access: AccessId, name: &str) {
    let scope = model.accesses[access].scope;
    let index = model.accesses[access].index;

    let assignments = model.resolve_name(scope, name, scope);
    let mut previous: SmallVec<[AssignmentId; 2]> = assignments
        .iter()
        .copied()
        .filter(|&assignment| {
            model.assignments[assignment].scope != scope
                || model.assignments[assignment].precedes(index)
        })
        .collect();
    if previous.is_empty() && !assignments.is_empty() {
        if let Some(parent) = model.scopes[scope].parent {
            previous = model.resolve_name(parent, name, scope);
        }
    }

    for assignment in previous {
        if !model.accesses[access].assignments.contains(&assignment) {
            model.accesses[access].assignments.push(assignment);
        }
    }
}

/// Records on `assignment` the accesses it may define. Accesses that happen
/// before it in its own scope belong to whatever the name resolved to in the
/// parent scope instead.
fn link_accesses(model: &mut SemanticModel<'_>, assignment: AssignmentId, accesses: &[AccessId]) {
    let scope = model.assignments[assignment].scope;

    let mut later = Vec::new();
    let mut earlier = Vec::new();
    for &access in accesses {
        if model.accesses[access].scope != scope
            || model.assignments[assignment].precedes(model.accesses[access].index)
        {
            later.push(access);
        } else {
            earlier.push(access);
        }
    }

    for access in later {
        if !model.assignments[assignment].accesses.contains(&access) {
            model.assignments[assignment].accesses.push(access);
        }
    }

    if !earlier.is_empty() {
        if let Some(parent) = model.scopes[scope].parent {
            let name = model.assignments[assignment].name;
            for shadowed in model.resolve_name(parent, name, parent) {
                link_accesses(model, shadowed, &earlier);
            }
        }
    }
}
