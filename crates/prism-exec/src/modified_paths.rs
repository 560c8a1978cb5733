use std::collections::BTreeSet;

/// Which output paths a transformation may change.
///
/// The planner relies on this to decide whether a later stage can assume a
/// field is untouched, so every answer over-approximates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModifiedPaths {
    /// Exactly these paths (and their descendants) may change.
    Finite(BTreeSet<String>),
    /// Every path may change except these preserved ones (and their
    /// descendants).
    AllExcept(BTreeSet<String>),
    /// No static answer; anything may change.
    AllPaths,
}

impl ModifiedPaths {
    pub fn is_all_paths(&self) -> bool {
        matches!(self, ModifiedPaths::AllPaths)
    }

    /// Whether `path` might differ between input and output.
    pub fn can_modify(&self, path: &str) -> bool {
        match self {
            ModifiedPaths::AllPaths => true,
            // A change to an ancestor or a descendant changes the path's value.
            ModifiedPaths::Finite(paths) => paths
                .iter()
                .any(|p| is_ancestor_or_self(p, path) || is_ancestor_or_self(path, p)),
            ModifiedPaths::AllExcept(preserved) => {
                !preserved.iter().any(|p| is_ancestor_or_self(p, path))
            }
        }
    }
}

fn is_ancestor_or_self(ancestor: &str, path: &str) -> bool {
    path.strip_prefix(ancestor)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(paths: &[&str]) -> BTreeSet<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn all_paths_modifies_everything() {
        assert!(ModifiedPaths::AllPaths.can_modify("anything.at.all"));
        assert!(ModifiedPaths::AllPaths.is_all_paths());
    }

    #[test]
    fn finite_covers_ancestors_and_descendants() {
        let modified = ModifiedPaths::Finite(set(&["a.b"]));
        assert!(modified.can_modify("a.b"));
        assert!(modified.can_modify("a.b.c"));
        assert!(modified.can_modify("a"));
        assert!(!modified.can_modify("a.c"));
        assert!(!modified.can_modify("ab"));
    }

    #[test]
    fn all_except_preserves_subtrees() {
        let modified = ModifiedPaths::AllExcept(set(&["a", "_id"]));
        assert!(!modified.can_modify("a"));
        assert!(!modified.can_modify("a.b"));
        assert!(!modified.can_modify("_id"));
        assert!(modified.can_modify("b"));
        assert!(modified.can_modify("ab"));
    }
}
