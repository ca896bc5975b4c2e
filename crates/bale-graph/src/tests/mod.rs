
use std::path::Path;

use crate::runtime::memory::MemoryRuntime;
use crate::{DependencyTree, ModuleGraph, ModuleIdx, Resolver};

/// Load the tree under `/app` and resolve `entries`.
pub(crate) async fn build(runtime: &MemoryRuntime, entries: &[&str]) -> (ModuleGraph, Vec<ModuleIdx>) {
    let (tree, _) = DependencyTree::load(runtime, Path::new("/app")).await.unwrap();
    let mut graph = ModuleGraph::new(&tree);
    let entries: Vec<String> = entries.iter().map(|e| e.to_string()).collect();
    let roots = Resolver::new(runtime, &mut graph)
        .resolve_all(&entries)
        .await
        .unwrap();
    (graph, roots)
}

pub(crate) fn ids(graph: &ModuleGraph, idxs: impl IntoIterator<Item = ModuleIdx>) -> Vec<String> {
    idxs.into_iter().map(|i| graph.module(i).id.clone()).collect()
}
