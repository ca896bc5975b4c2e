//! Session-scoped packet and module registry.
//!
//! Packets and modules live in two arenas addressed by [`PacketIdx`] and
//! [`ModuleIdx`]. Both registries are append-only during a build and keyed by
//! `(name, version)` and module id respectively, so repeated lookups are
//! insert-if-absent.

use std::collections::{BTreeSet, VecDeque};
use std::path::Path;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::warn;

use crate::diagnostic::Diagnostic;
use crate::module::{ModuleIdx, ModuleNode};
use crate::packet::{Packet, PacketIdx};
use crate::source_kind::SourceKind;
use crate::tree::{DependencyTree, FlatMap, flatten};

#[derive(Debug, Clone)]
pub struct ModuleGraph {
    packets: Vec<Packet>,
    packet_index: FxHashMap<(String, String), PacketIdx>,
    modules: Vec<ModuleNode>,
    module_index: FxHashMap<String, ModuleIdx>,
    flat: FlatMap,
    root: PacketIdx,
    diagnostics: Vec<Diagnostic>,
}

impl ModuleGraph {
    /// Create a graph for the installed tree; only the root packet exists
    /// until resolution reaches others.
    pub fn new(tree: &DependencyTree) -> Self {
        let flat = flatten(tree);
        let root_packet = Packet::new(
            tree.name.clone(),
            tree.version.clone(),
            tree.dir.clone(),
            tree.main.clone(),
            tree.dependencies
                .iter()
                .map(|(name, dep)| (name.clone(), dep.version.clone()))
                .collect(),
            None,
        );

        let mut packet_index = FxHashMap::default();
        packet_index.insert((tree.name.clone(), tree.version.clone()), PacketIdx(0));

        Self {
            packets: vec![root_packet],
            packet_index,
            modules: Vec::new(),
            module_index: FxHashMap::default(),
            flat,
            root: PacketIdx(0),
            diagnostics: Vec::new(),
        }
    }

    pub fn root(&self) -> PacketIdx {
        self.root
    }

    pub fn flat(&self) -> &FlatMap {
        &self.flat
    }

    pub fn packet(&self, idx: PacketIdx) -> &Packet {
        &self.packets[idx.index()]
    }

    pub fn packet_mut(&mut self, idx: PacketIdx) -> &mut Packet {
        &mut self.packets[idx.index()]
    }

    pub fn packets(&self) -> impl Iterator<Item = (PacketIdx, &Packet)> {
        self.packets
            .iter()
            .enumerate()
            .map(|(i, p)| (PacketIdx(i as u32), p))
    }

    pub fn find_packet(&self, name: &str, version: &str) -> Option<PacketIdx> {
        self.packet_index
            .get(&(name.to_string(), version.to_string()))
            .copied()
    }

    /// Return the packet for `(name, version)`, creating it from the flat map
    /// the first time it is reached. `None` if the pair isn't installed.
    pub fn get_or_create_packet(
        &mut self,
        name: &str,
        version: &str,
        parent: PacketIdx,
    ) -> Option<PacketIdx> {
        if let Some(idx) = self.find_packet(name, version) {
            return Some(idx);
        }
        let entry = self.flat.get(name, version)?;
        let packet = Packet::new(
            name,
            version,
            entry.dir.clone(),
            entry.main(),
            entry.dependencies.clone(),
            Some(parent),
        );
        let idx = PacketIdx(self.packets.len() as u32);
        self.packets.push(packet);
        self.packet_index
            .insert((name.to_string(), version.to_string()), idx);
        Some(idx)
    }

    /// Scope chain for bare lookups, starting at `from`.
    pub fn scope_chain(&self, from: PacketIdx) -> impl Iterator<Item = PacketIdx> + '_ {
        let mut seen = FxHashSet::default();
        std::iter::successors(Some(from), move |idx| self.packet(*idx).parent)
            .take_while(move |idx| seen.insert(*idx))
    }

    pub fn module(&self, idx: ModuleIdx) -> &ModuleNode {
        &self.modules[idx.index()]
    }

    pub fn module_mut(&mut self, idx: ModuleIdx) -> &mut ModuleNode {
        &mut self.modules[idx.index()]
    }

    pub fn modules(&self) -> impl Iterator<Item = (ModuleIdx, &ModuleNode)> {
        self.modules
            .iter()
            .enumerate()
            .map(|(i, m)| (ModuleIdx(i as u32), m))
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn module_by_id(&self, id: &str) -> Option<ModuleIdx> {
        self.module_index.get(id).copied()
    }

    /// Register a module, or return the one already registered under its id.
    ///
    /// Packet-owned modules are also recorded in their packet under `rel_path`.
    pub fn add_module(&mut self, node: ModuleNode, rel_path: Option<&str>) -> ModuleIdx {
        if let Some(idx) = self.module_by_id(&node.id) {
            if let (Some(packet), Some(rel)) = (node.packet, rel_path) {
                self.packet_mut(packet)
                    .modules
                    .entry(rel.to_string())
                    .or_insert(idx);
            }
            return idx;
        }
        let idx = ModuleIdx(self.modules.len() as u32);
        if let (Some(packet), Some(rel)) = (node.packet, rel_path) {
            self.packet_mut(packet).modules.insert(rel.to_string(), idx);
        }
        self.module_index.insert(node.id.clone(), idx);
        self.modules.push(node);
        idx
    }

    /// Modules whose file is `path` (a stub keeps the path it was looked up at).
    pub fn modules_at_path(&self, path: &Path) -> Vec<ModuleIdx> {
        self.modules()
            .filter(|(_, m)| m.file_path.as_deref() == Some(path))
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Stubs that a file appearing at `path` could now satisfy: `path` is the
    /// stub's lookup path plus a known extension, or lies inside it (an index
    /// file or a directory's package.json).
    pub fn stubs_satisfied_by(&self, path: &Path) -> Vec<ModuleIdx> {
        self.modules()
            .filter(|(_, m)| m.kind == SourceKind::Stub && m.packet.is_some())
            .filter(|(_, m)| {
                m.file_path
                    .as_deref()
                    .is_some_and(|stub| stub != path && satisfies(stub, path))
            })
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Drop a module from its packet's path table so the next lookup of that
    /// path searches the filesystem again. The node stays registered by id.
    pub fn detach(&mut self, idx: ModuleIdx) {
        if let Some(packet) = self.module(idx).packet {
            self.packet_mut(packet).modules.retain(|_, m| *m != idx);
        }
    }

    /// Modules that import `target`, statically or dynamically.
    pub fn importers(&self, target: ModuleIdx) -> Vec<ModuleIdx> {
        self.modules()
            .filter(|(_, m)| m.children.contains(&target) || m.dynamic_children.contains(&target))
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Static-import closure of `roots`, roots included.
    pub fn static_closure(&self, roots: impl IntoIterator<Item = ModuleIdx>) -> BTreeSet<ModuleIdx> {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<ModuleIdx> = roots.into_iter().collect();
        while let Some(idx) = stack.pop() {
            if seen.insert(idx) {
                stack.extend(self.module(idx).children.iter().copied());
            }
        }
        seen
    }

    /// Shortest static-or-dynamic import chain from any of `roots` to `target`,
    /// as module ids. Empty when `target` is unreachable.
    pub fn dependency_chain(&self, roots: &[ModuleIdx], target: ModuleIdx) -> Vec<String> {
        let mut parent: FxHashMap<ModuleIdx, Option<ModuleIdx>> = FxHashMap::default();
        let mut queue = VecDeque::new();
        for &root in roots {
            if parent.insert(root, None).is_none() {
                queue.push_back(root);
            }
        }

        while let Some(idx) = queue.pop_front() {
            if idx == target {
                let mut chain = vec![self.module(idx).id.clone()];
                let mut current = idx;
                while let Some(Some(prev)) = parent.get(&current) {
                    chain.push(self.module(*prev).id.clone());
                    current = *prev;
                }
                chain.reverse();
                return chain;
            }
            let node = self.module(idx);
            for &child in node.children.iter().chain(&node.dynamic_children) {
                if let std::collections::hash_map::Entry::Vacant(e) = parent.entry(child) {
                    e.insert(Some(idx));
                    queue.push_back(child);
                }
            }
        }
        Vec::new()
    }

    /// Mark a module for re-resolution on the next walk.
    pub fn invalidate(&mut self, idx: ModuleIdx) {
        self.module_mut(idx).reset();
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        warn!("{diagnostic}");
        self.diagnostics.push(diagnostic);
    }

    /// Drain diagnostics collected since the last call.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }
}

fn satisfies(stub: &Path, path: &Path) -> bool {
    if path.starts_with(stub) {
        return true;
    }
    let (Some(dir), Some(name)) = (stub.parent(), stub.file_name()) else {
        return false;
    };
    path.parent() == Some(dir)
        && SourceKind::RESOLVE_EXTENSIONS.iter().any(|ext| {
            let mut candidate = name.to_os_string();
            candidate.push(format!(".{ext}"));
            path.file_name() == Some(candidate.as_os_str())
        })
}
