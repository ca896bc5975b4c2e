//! Change detection for watch-mode reloads.
//!
//! A changed file maps to the modules read from it. Those modules and their
//! direct importers have to be re-walked: the importer's resolved children may
//! point at a node whose identity just changed (a stub that now exists, a
//! directory that gained an index file).

use std::collections::BTreeSet;
use std::path::Path;

use bale_graph::{ModuleGraph, ModuleIdx};

/// Set of changed modules and the modules that must be re-walked because of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Ids of modules whose file changed.
    pub modified: BTreeSet<String>,

    /// Ids of every module invalidated by the change.
    ///
    /// This is `modified` plus every direct importer of a modified module.
    pub affected: BTreeSet<String>,

    /// The change touched a manifest; the whole graph was discarded.
    pub full_rebuild: bool,
}

impl ChangeSet {
    /// A change that throws the graph away.
    pub fn full() -> Self {
        Self {
            full_rebuild: true,
            ..Self::default()
        }
    }

    /// Returns true if anything needs rebuilding.
    pub fn has_changes(&self) -> bool {
        self.full_rebuild || !self.modified.is_empty()
    }

    /// Returns the total number of affected modules.
    pub fn affected_count(&self) -> usize {
        self.affected.len()
    }
}

/// Whether a change to `path` invalidates the installed dependency tree.
pub fn is_manifest(path: &Path) -> bool {
    path.file_name().is_some_and(|name| name == "package.json")
}

/// Modules read from `path`, stubs a new file at `path` could satisfy, and
/// the direct importers of both, as indices.
///
/// Returns `(modified, affected)`; `affected` includes `modified`.
pub fn affected_modules(graph: &ModuleGraph, path: &Path) -> (Vec<ModuleIdx>, Vec<ModuleIdx>) {
    let mut modified = graph.modules_at_path(path);
    modified.extend(graph.stubs_satisfied_by(path));
    let mut affected: BTreeSet<ModuleIdx> = modified.iter().copied().collect();
    for &idx in &modified {
        affected.extend(graph.importers(idx));
    }
    (modified, affected.into_iter().collect())
}

/// Describe the effect of a change to `path` on `graph` without mutating it.
pub fn detect_changes(graph: &ModuleGraph, path: &Path) -> ChangeSet {
    let (modified, affected) = affected_modules(graph, path);
    ChangeSet {
        modified: modified.iter().map(|&i| graph.module(i).id.clone()).collect(),
        affected: affected.iter().map(|&i| graph.module(i).id.clone()).collect(),
        full_rebuild: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bale_graph::{DependencyTree, MemoryRuntime, Resolver};

    async fn graph(runtime: &MemoryRuntime) -> ModuleGraph {
        let (tree, _) = DependencyTree::load(runtime, Path::new("/app"))
            .await
            .unwrap();
        let mut graph = ModuleGraph::new(&tree);
        Resolver::new(runtime, &mut graph)
            .resolve("home.js")
            .await
            .unwrap();
        graph
    }

    #[tokio::test]
    async fn test_importers_are_affected() {
        let runtime = MemoryRuntime::new()
            .with_file("/app/package.json", r#"{"name":"app","version":"1.0.0"}"#)
            .with_file("/app/home.js", "require('./a'); require('./b');")
            .with_file("/app/a.js", "require('./c');")
            .with_file("/app/b.js", "")
            .with_file("/app/c.js", "");
        let graph = graph(&runtime).await;

        let changes = detect_changes(&graph, Path::new("/app/c.js"));
        assert!(changes.has_changes());
        assert_eq!(
            changes.modified,
            BTreeSet::from(["app/1.0.0/c.js".to_string()])
        );
        assert_eq!(
            changes.affected,
            BTreeSet::from(["app/1.0.0/a.js".to_string(), "app/1.0.0/c.js".to_string()])
        );
        assert_eq!(changes.affected_count(), 2);
    }

    #[tokio::test]
    async fn test_unrelated_path_has_no_changes() {
        let runtime = MemoryRuntime::new()
            .with_file("/app/package.json", r#"{"name":"app","version":"1.0.0"}"#)
            .with_file("/app/home.js", "");
        let graph = graph(&runtime).await;

        assert!(!detect_changes(&graph, Path::new("/app/readme.md")).has_changes());
    }

    #[tokio::test]
    async fn test_new_file_affects_extensionless_stub() {
        let runtime = MemoryRuntime::new()
            .with_file("/app/package.json", r#"{"name":"app","version":"1.0.0"}"#)
            .with_file("/app/home.js", "require('./missing'); require('./widgets');");
        let graph = graph(&runtime).await;

        let changes = detect_changes(&graph, Path::new("/app/missing.ts"));
        assert_eq!(
            changes.modified,
            BTreeSet::from(["app/1.0.0/missing".to_string()])
        );
        assert!(changes.affected.contains("app/1.0.0/home.js"));

        let changes = detect_changes(&graph, Path::new("/app/widgets/index.js"));
        assert_eq!(
            changes.modified,
            BTreeSet::from(["app/1.0.0/widgets".to_string()])
        );

        assert!(!detect_changes(&graph, Path::new("/app/missing.txt")).has_changes());
        assert!(!detect_changes(&graph, Path::new("/app/missingno.js")).has_changes());
    }

    #[test]
    fn test_manifest_detection() {
        assert!(is_manifest(Path::new("/app/node_modules/react/package.json")));
        assert!(!is_manifest(Path::new("/app/package.json.bak")));
        assert!(ChangeSet::full().has_changes());
    }
}
