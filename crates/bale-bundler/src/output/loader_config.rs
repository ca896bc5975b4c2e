//! `loaderConfig.json` assembly.

use std::path::Path;

use bale_graph::{LoaderConfig, Lock, ModuleGraph, ModuleIdx, OutputFormat};

use super::emit::EmittedBundle;
use super::writer::{OutputFile, write_files};
use crate::bundle::BundlePlan;
use crate::Result;

pub const LOADER_CONFIG_FILE: &str = "loaderConfig.json";

/// Build the loader's view of a finished build.
///
/// Every module registered by a JS bundle (its own members plus the
/// stylesheet stubs of its CSS sibling) is recorded in the lock manifest
/// under the bundle's file, so the loader can fetch any module by id.
pub fn build_loader_config(
    graph: &ModuleGraph,
    plan: &BundlePlan,
    emitted: &[EmittedBundle],
    base_url: &str,
    preload: &[ModuleIdx],
) -> LoaderConfig {
    let mut lock = Lock::from_graph(graph);

    for (bundle, out) in plan.iter().zip(emitted) {
        if bundle.format != OutputFormat::Js {
            continue;
        }
        let stubs = plan
            .css_sibling(bundle)
            .map(|css| css.members.iter().copied().collect::<Vec<_>>())
            .unwrap_or_default();
        for idx in bundle.members.iter().copied().chain(stubs) {
            let node = graph.module(idx);
            let Some(packet_idx) = node.packet else {
                continue;
            };
            let packet = graph.packet(packet_idx);
            let prefix = format!("{}/{}/", packet.name, packet.version);
            if let Some(rel) = node.id.strip_prefix(&prefix) {
                lock.record_output(&packet.name, &packet.version, rel, &out.file);
            }
        }
    }

    let root = graph.packet(graph.root());
    LoaderConfig {
        package: format!("{}/{}", root.name, root.version),
        modules: graph.flat().clone(),
        lock,
        base_url: base_url.to_string(),
        preload: preload
            .iter()
            .map(|&idx| graph.module(idx).id.clone())
            .collect(),
    }
}

/// Write `loaderConfig.json` into `out_dir`, replacing any previous one.
pub fn write_loader_config(out_dir: &Path, config: &LoaderConfig) -> Result<()> {
    let json = config
        .to_json()
        .map_err(|e| crate::Error::WriteFailure(format!("Failed to serialize loader config: {e}")))?;
    write_files(out_dir, &[OutputFile::new(LOADER_CONFIG_FILE, json)], true)
}
