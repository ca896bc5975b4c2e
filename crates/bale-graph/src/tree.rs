//! Installed dependency tree and its flattened projection.
//!
//! [`DependencyTree`] mirrors nested `node_modules` installation: the same
//! package name may appear at different versions at different depths.
//! [`flatten`] projects it into a [`FlatMap`] (`name → version → entry`) that
//! the resolver and the loader config share.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, warn};

use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::package_json::{DEFAULT_MAIN, PackageJson};
use crate::runtime::Runtime;
use crate::{Error, Result};

/// One node of the installed tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyTree {
    pub name: String,
    pub version: String,
    pub main: String,
    #[serde(skip)]
    pub dir: PathBuf,
    #[serde(default)]
    pub dependencies: BTreeMap<String, DependencyTree>,
}

/// Metadata recorded per `(name, version)` in a [`FlatMap`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatEntry {
    /// Omitted when equal to the conventional `index.js`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,
    /// Install location; build-time only.
    #[serde(skip)]
    pub dir: PathBuf,
}

impl FlatEntry {
    /// Entry file, falling back to `index.js`.
    pub fn main(&self) -> &str {
        self.main.as_deref().unwrap_or(DEFAULT_MAIN)
    }
}

/// Two-level lookup table `name → version → entry`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlatMap(pub BTreeMap<String, BTreeMap<String, FlatEntry>>);

impl FlatMap {
    pub fn get(&self, name: &str, version: &str) -> Option<&FlatEntry> {
        self.0.get(name).and_then(|versions| versions.get(version))
    }

    /// All versions recorded for `name`.
    pub fn versions(&self, name: &str) -> impl Iterator<Item = &str> {
        self.0
            .get(name)
            .into_iter()
            .flat_map(|versions| versions.keys().map(String::as_str))
    }

    /// Number of `(name, version)` pairs.
    pub fn len(&self) -> usize {
        self.0.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Flatten a dependency tree depth-first.
///
/// Each `(name, version)` is recorded once no matter how many times it occurs.
/// The path stack only guards against pathological self-references.
pub fn flatten(tree: &DependencyTree) -> FlatMap {
    let mut flat = FlatMap::default();
    let mut stack: Vec<(&str, &str)> = Vec::new();
    flatten_node(tree, &mut flat, &mut stack);
    flat
}

fn flatten_node<'a>(
    node: &'a DependencyTree,
    flat: &mut FlatMap,
    stack: &mut Vec<(&'a str, &'a str)>,
) {
    let key = (node.name.as_str(), node.version.as_str());
    if stack.contains(&key) {
        debug!(name = key.0, version = key.1, "dependency cycle while flattening");
        return;
    }

    flat.0
        .entry(node.name.clone())
        .or_default()
        .entry(node.version.clone())
        .or_insert_with(|| FlatEntry {
            main: (node.main != DEFAULT_MAIN).then(|| node.main.clone()),
            dependencies: node
                .dependencies
                .iter()
                .map(|(name, dep)| (name.clone(), dep.version.clone()))
                .collect(),
            dir: node.dir.clone(),
        });

    stack.push(key);
    for dep in node.dependencies.values() {
        flatten_node(dep, flat, stack);
    }
    stack.pop();
}

impl DependencyTree {
    /// Load the installed tree rooted at `root` (a directory with package.json).
    ///
    /// Dependencies are located the way Node does: the nearest
    /// `node_modules/<name>` walking upward from the dependent's directory, but
    /// never above `root`. Dependencies that aren't installed are skipped and
    /// reported as diagnostics.
    pub async fn load(runtime: &dyn Runtime, root: &Path) -> Result<(Self, Vec<Diagnostic>)> {
        let mut manifests: FxHashMap<PathBuf, PackageJson> = FxHashMap::default();
        let mut children: FxHashMap<PathBuf, Vec<(String, PathBuf)>> = FxHashMap::default();
        let mut diagnostics = Vec::new();
        let mut queue = VecDeque::from([root.to_path_buf()]);
        let mut seen: FxHashSet<PathBuf> = FxHashSet::default();

        while let Some(dir) = queue.pop_front() {
            if !seen.insert(dir.clone()) {
                continue;
            }
            let pkg = PackageJson::from_path(runtime, &dir.join("package.json")).await?;

            let mut edges = Vec::new();
            for name in pkg.dependencies.keys() {
                match locate_installed(runtime, root, &dir, name) {
                    Some(child) => {
                        queue.push_back(child.clone());
                        edges.push((name.clone(), child));
                    }
                    None => {
                        warn!(dependency = %name, from = %dir.display(), "dependency not installed");
                        diagnostics.push(Diagnostic::new(
                            DiagnosticKind::MissingDependency,
                            format!("{name} is declared by {} but not installed", dir.display()),
                        ));
                    }
                }
            }
            children.insert(dir.clone(), edges);
            manifests.insert(dir, pkg);
        }

        let mut stack = Vec::new();
        let tree = build_node(root, &manifests, &children, &mut stack)?;
        Ok((tree, diagnostics))
    }

    /// Total number of nodes, counting shared subtrees each time they appear.
    pub fn node_count(&self) -> usize {
        1 + self
            .dependencies
            .values()
            .map(DependencyTree::node_count)
            .sum::<usize>()
    }
}

fn locate_installed(runtime: &dyn Runtime, root: &Path, from: &Path, name: &str) -> Option<PathBuf> {
    let mut current = Some(from);
    while let Some(dir) = current {
        let candidate = dir.join("node_modules").join(name);
        if runtime.exists(&candidate.join("package.json")) {
            return Some(candidate);
        }
        if dir == root {
            break;
        }
        current = dir.parent();
    }
    None
}

fn build_node(
    dir: &Path,
    manifests: &FxHashMap<PathBuf, PackageJson>,
    children: &FxHashMap<PathBuf, Vec<(String, PathBuf)>>,
    stack: &mut Vec<PathBuf>,
) -> Result<DependencyTree> {
    let pkg = manifests
        .get(dir)
        .ok_or_else(|| Error::InvalidPackage(format!("no manifest loaded for {}", dir.display())))?;
    let name = pkg
        .name
        .clone()
        .unwrap_or_else(|| dir_name(dir));
    let version = pkg.version.clone().unwrap_or_else(|| "0.0.0".to_string());

    let mut node = DependencyTree {
        name,
        version,
        main: pkg.entry().to_string(),
        dir: dir.to_path_buf(),
        dependencies: BTreeMap::new(),
    };

    // A package reachable from itself keeps its identity but not its subtree.
    if stack.iter().any(|d| d == dir) {
        return Ok(node);
    }

    stack.push(dir.to_path_buf());
    for (dep_name, child_dir) in children.get(dir).into_iter().flatten() {
        let child = build_node(child_dir, manifests, children, stack)?;
        node.dependencies.insert(dep_name.clone(), child);
    }
    stack.pop();

    Ok(node)
}

fn dir_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "app".to_string())
}
