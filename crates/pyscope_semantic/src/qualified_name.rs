use pyscope_ast::{Ast, Stmt, StmtId};

/// Where a qualified name comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, is_macro::Is)]
pub enum QualifiedNameSource {
    /// Declared in this module; nested declarations carry `<locals>` and
    /// `<comprehension>` markers.
    Local,
    /// Bound by an import; the name is rewritten onto the imported module
    /// path.
    Import,
    /// A member of the builtin namespace, prefixed with `builtins.`.
    Builtin,
}

/// A dotted name qualified by its defining module path or scope chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedName {
    pub name: String,
    pub source: QualifiedNameSource,
}

impl QualifiedName {
    pub(crate) fn local(name: String) -> Self {
        Self {
            name,
            source: QualifiedNameSource::Local,
        }
    }

    pub(crate) fn import(name: String) -> Self {
        Self {
            name,
            source: QualifiedNameSource::Import,
        }
    }

    pub(crate) fn builtin(name: &str) -> Self {
        Self {
            name: format!("builtins.{name}"),
            source: QualifiedNameSource::Builtin,
        }
    }
}

/// Joins a scope prefix and a name into a dotted path.
pub(crate) fn join_prefix(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

/// Rewrites `full_name`, bound by the import statement `stmt`, onto the
/// imported module path.
///
/// Each alias is tried against every dotted prefix of its real name, longest
/// first: `import a.b.c` matches `a.b.c`, `a.b` and `a`, while an `as` alias
/// matches only itself. A match must end at a dot boundary in `full_name`;
/// the unmatched remainder is carried over onto the module path. Relative
/// imports keep their leading dots.
pub(crate) fn import_qualified_names(
    ast: &Ast,
    stmt: StmtId,
    full_name: &str,
) -> Vec<QualifiedName> {
    let (module, names) = match &ast[stmt] {
        Stmt::Import(import) => (String::new(), &import.names),
        Stmt::ImportFrom(import) => {
            let mut module = ".".repeat(import.level as usize);
            if let Some(name) = &import.module {
                module.push_str(name);
            }
            (module, &import.names)
        }
        _ => return Vec::new(),
    };

    let mut results = Vec::new();
    for alias in names {
        let mut real_name: &str = &alias.name;
        loop {
            let as_name = alias
                .asname
                .as_ref()
                .map_or(real_name, |asname| asname.as_str());
            if let Some(remaining) = strip_dotted_prefix(full_name, as_name) {
                let mut qualified = if module.is_empty() {
                    real_name.to_string()
                } else if module.ends_with('.') {
                    format!("{module}{real_name}")
                } else {
                    format!("{module}.{real_name}")
                };
                if !remaining.is_empty() {
                    qualified.push('.');
                    qualified.push_str(remaining);
                }
                results.push(QualifiedName::import(qualified));
                break;
            }
            match real_name.rfind('.') {
                Some(dot) => real_name = &real_name[..dot],
                None => break,
            }
        }
    }
    results
}

/// Strips `prefix` from `name` if it matches whole dotted segments,
/// returning the remainder without its leading dot.
fn strip_dotted_prefix<'n>(name: &'n str, prefix: &str) -> Option<&'n str> {
    let remaining = name.strip_prefix(prefix)?;
    if remaining.is_empty() {
        Some(remaining)
    } else {
        remaining.strip_prefix('.')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(results: &[QualifiedName]) -> Vec<&str> {
        results.iter().map(|q| q.name.as_str()).collect::<Vec<_>>()
    }

    #[test]
    fn plain_import_prefixes() {
        let mut ast = Ast::new();
        let stmt = ast.import(&[("a.b.c", None)]);
        assert_eq!(names(&import_qualified_names(&ast, stmt, "a.b.c.d")), ["a.b.c.d"]);
        assert_eq!(names(&import_qualified_names(&ast, stmt, "a.b")), ["a.b"]);
        assert_eq!(names(&import_qualified_names(&ast, stmt, "ab")), [""; 0]);
    }

    #[test]
    fn aliased_import() {
        let mut ast = Ast::new();
        let stmt = ast.import(&[("numpy", Some("np"))]);
        assert_eq!(
            names(&import_qualified_names(&ast, stmt, "np.cos")),
            ["numpy.cos"]
        );
        // The alias does not match a longer identifier sharing the prefix.
        assert_eq!(names(&import_qualified_names(&ast, stmt, "npx")), [""; 0]);
    }

    #[test]
    fn from_import_with_relative_dots() {
        let mut ast = Ast::new();
        let stmt = ast.import_from(Some("pkg"), &[("mod", None)], 1);
        assert_eq!(
            names(&import_qualified_names(&ast, stmt, "mod.f")),
            [".pkg.mod.f"]
        );

        let bare = ast.import_from(None, &[("mod", None)], 2);
        assert_eq!(names(&import_qualified_names(&ast, bare, "mod")), ["..mod"]);
    }
}
