//! Shared test utilities for bale-bundler tests

#![allow(dead_code)]

use bale_bundler::{Bundle, BundlePlan, BundlePolicy, BuildConfig, BuildSession};
use bale_graph::{
    DependencyTree, MemoryRuntime, ModuleGraph, ModuleIdx, OutputFormat, Resolver,
    TranspilerRegistry,
};
use std::path::Path;
use std::sync::Arc;

/// A runtime holding `/app/package.json` with `dependencies`.
pub fn app(dependencies: &str) -> MemoryRuntime {
    MemoryRuntime::new().with_file(
        "/app/package.json",
        format!(r#"{{"name":"app","version":"1.0.0","dependencies":{dependencies}}}"#),
    )
}

/// Install `name@version` at `/app/node_modules/<name>` with an index.js.
pub fn install(runtime: MemoryRuntime, name: &str, version: &str, deps: &str, index: &str) -> MemoryRuntime {
    runtime
        .with_file(
            format!("/app/node_modules/{name}/package.json"),
            format!(r#"{{"name":"{name}","version":"{version}","dependencies":{deps}}}"#),
        )
        .with_file(format!("/app/node_modules/{name}/index.js"), index)
}

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Resolve the roots of a policy against `/app`.
pub async fn resolve(
    runtime: &MemoryRuntime,
    entries: &[&str],
    preload: &[&str],
    lazyload: &[&str],
    isolate: &[&str],
) -> (ModuleGraph, BundlePolicy) {
    let (tree, _) = DependencyTree::load(runtime, Path::new("/app")).await.unwrap();
    let mut graph = ModuleGraph::new(&tree);
    let mut resolver = Resolver::new(runtime, &mut graph);
    let entries = resolver.resolve_all(&owned(entries)).await.unwrap();
    let preload = resolver.resolve_all(&owned(preload)).await.unwrap();
    let lazyload = resolver.resolve_all(&owned(lazyload)).await.unwrap();
    let policy = BundlePolicy {
        entries,
        preload,
        lazyload,
        isolate: owned(isolate),
    };
    (graph, policy)
}

pub fn members(graph: &ModuleGraph, bundle: &Bundle) -> Vec<String> {
    let mut ids: Vec<String> = bundle.member_ids(graph).map(str::to_string).collect();
    ids.sort();
    ids
}

pub fn js<'a>(plan: &'a BundlePlan, name: &str) -> &'a Bundle {
    plan.get(name, OutputFormat::Js)
        .unwrap_or_else(|| panic!("no JS bundle named {name}: {plan:#?}"))
}

pub fn id_of(graph: &ModuleGraph, id: &str) -> ModuleIdx {
    graph.module_by_id(id).unwrap_or_else(|| panic!("no module {id}"))
}

/// A session over `runtime` rooted at `/app` with caching disabled.
pub fn session(runtime: MemoryRuntime, config: BuildConfig) -> BuildSession {
    BuildSession::new(
        config.cache_dir(None),
        Arc::new(runtime),
        TranspilerRegistry::with_builtins(),
    )
    .unwrap()
}
