//! Resolve an installed project and print its packets and lock.
//!
//! ```text
//! cargo run -p bale-graph --example resolve_project -- ./app home.js
//! ```

use bale_graph::{DependencyTree, Lock, ModuleGraph, NativeRuntime, Resolver};
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let root = PathBuf::from(args.next().unwrap_or_else(|| ".".into()));
    let entries: Vec<String> = args.collect();
    let entries = if entries.is_empty() { vec!["./index.js".into()] } else { entries };

    let runtime = NativeRuntime::new();
    let (tree, diagnostics) = DependencyTree::load(&runtime, &root).await?;
    println!("{} installed packages", tree.node_count());

    let mut graph = ModuleGraph::new(&tree);
    let roots = Resolver::new(&runtime, &mut graph).resolve_all(&entries).await?;

    for (_, packet) in graph.packets() {
        println!("{}@{} ({} modules)", packet.name, packet.version, packet.modules.len());
        for &idx in packet.modules.values() {
            let module = graph.module(idx);
            println!("  {} [{:?}] -> {:?}", module.id, module.kind, module.static_imports);
        }
    }
    println!(
        "{} modules reachable from {} entries",
        graph.static_closure(roots.iter().copied()).len(),
        roots.len()
    );

    for diagnostic in diagnostics.iter().chain(graph.diagnostics()) {
        eprintln!("warning: {diagnostic}");
    }

    println!("{}", serde_json::to_string_pretty(&Lock::from_graph(&graph))?);
    Ok(())
}
