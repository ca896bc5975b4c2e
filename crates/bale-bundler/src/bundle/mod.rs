//! Bundle computation.
//!
//! A [`BundlePlan`] partitions the reachable graph into named bundles. Each
//! bundle's membership is its roots' static closure minus everything already
//! claimed by bundles that load before it, so bundles that can be on a page at
//! the same time never share a module.

mod compute;
mod naming;

pub use compute::{BundlePolicy, compute_bundles};
pub use naming::{bundle_name, file_name, sanitize};

use std::collections::BTreeSet;

use blake3::Hasher;
use serde::{Deserialize, Serialize};

use bale_graph::{ModuleGraph, ModuleIdx, OutputFormat};

/// Why a bundle exists. Also the order bundles claim modules in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BundleKind {
    /// A package forced into a standalone bundle.
    Isolated,
    /// Loaded before any entry.
    Preload,
    /// A page entry. Entries are alternatives and may overlap each other.
    Entry,
    /// Kept out of eager bundles; fetched when first required.
    Lazyload,
    /// Target of a dynamic import not covered by any other bundle.
    Dynamic,
}

/// One output artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    pub name: String,
    pub kind: BundleKind,
    pub format: OutputFormat,
    /// Modules the bundle was computed from.
    pub roots: Vec<ModuleIdx>,
    pub members: BTreeSet<ModuleIdx>,
}

impl Bundle {
    /// BLAKE3 over `(id, output digest)` of every member, in id order.
    ///
    /// Members without transpiled output contribute an empty digest.
    pub fn content_hash(&self, graph: &ModuleGraph) -> String {
        let mut entries: Vec<(&str, String)> = self
            .members
            .iter()
            .map(|&idx| {
                let node = graph.module(idx);
                let digest = node
                    .cache
                    .as_ref()
                    .map(|out| {
                        let mut h = Hasher::new();
                        h.update(out.code.as_bytes());
                        h.update(b"\0");
                        h.update(out.map.as_deref().unwrap_or_default().as_bytes());
                        h.finalize().to_hex().to_string()
                    })
                    .unwrap_or_default();
                (node.id.as_str(), digest)
            })
            .collect();
        entries.sort();

        let mut hasher = Hasher::new();
        hasher.update(self.name.as_bytes());
        hasher.update(b"\n");
        for (id, digest) in entries {
            hasher.update(id.as_bytes());
            hasher.update(b"\0");
            hasher.update(digest.as_bytes());
            hasher.update(b"\n");
        }
        hasher.finalize().to_hex().to_string()
    }

    pub fn member_ids<'a>(&'a self, graph: &'a ModuleGraph) -> impl Iterator<Item = &'a str> + 'a {
        self.members.iter().map(|&idx| graph.module(idx).id.as_str())
    }
}

/// Output of [`compute_bundles`]: JS bundles in claim order, each optionally
/// followed by its CSS sibling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundlePlan {
    pub bundles: Vec<Bundle>,
}

impl BundlePlan {
    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bundle> {
        self.bundles.iter()
    }

    pub fn get(&self, name: &str, format: OutputFormat) -> Option<&Bundle> {
        self.bundles
            .iter()
            .find(|b| b.name == name && b.format == format)
    }

    /// The CSS bundle sharing `bundle`'s name, if `bundle` is a JS bundle.
    pub fn css_sibling(&self, bundle: &Bundle) -> Option<&Bundle> {
        match bundle.format {
            OutputFormat::Js => self.get(&bundle.name, OutputFormat::Css),
            OutputFormat::Css => None,
        }
    }

    /// Whether two bundles may be present on one page at the same time.
    ///
    /// Only distinct entries are alternatives; every other pair can coexist.
    pub fn co_loadable(a: &Bundle, b: &Bundle) -> bool {
        !(a.kind == BundleKind::Entry && b.kind == BundleKind::Entry && a.name != b.name)
    }
}
