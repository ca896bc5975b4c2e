//! Graph resolver.
//!
//! Starting from an entry specifier, every import found in a module's source
//! is resolved to a [`ModuleNode`](crate::ModuleNode), creating packets as
//! resolution crosses into installed dependencies:
//!
//! - relative imports resolve inside the importer's packet (see [`local`]);
//!   anything that can't be found becomes an empty stub
//! - bare imports use nearest-scope-wins over the packet parent chain
//! - URL imports become external nodes that are referenced, never read
//!
//! The walk uses an explicit worklist. A node is marked `Resolving` before its
//! imports are looked at and is never visited twice, so import cycles
//! terminate without special casing.

pub mod local;

use std::path::Path;

use rustc_hash::FxHashSet;
use tracing::{debug, trace};

use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::graph::ModuleGraph;
use crate::identifier::Identifier;
use crate::module::{ModuleIdx, ModuleNode, ModuleState};
use crate::packet::PacketIdx;
use crate::runtime::{Runtime, RuntimeError};
use crate::source_kind::SourceKind;
use crate::{Error, Result};

pub struct Resolver<'a> {
    runtime: &'a dyn Runtime,
    graph: &'a mut ModuleGraph,
}

impl<'a> Resolver<'a> {
    pub fn new(runtime: &'a dyn Runtime, graph: &'a mut ModuleGraph) -> Self {
        Self { runtime, graph }
    }

    /// Resolve `entry` and everything reachable from it.
    ///
    /// `entry` is a path relative to the root packet (`./home.js` or
    /// `home.js`) or a bare specifier looked up from the root packet.
    pub async fn resolve(&mut self, entry: &str) -> Result<ModuleIdx> {
        let idx = self.locate_entry(entry).await?;
        self.walk(idx).await?;
        if self.graph.module(idx).is_stub() {
            return Err(Error::EntryNotFound(entry.to_string()));
        }
        Ok(idx)
    }

    pub async fn resolve_all(&mut self, entries: &[String]) -> Result<Vec<ModuleIdx>> {
        let mut resolved = Vec::with_capacity(entries.len());
        for entry in entries {
            resolved.push(self.resolve(entry).await?);
        }
        Ok(resolved)
    }

    async fn locate_entry(&mut self, entry: &str) -> Result<ModuleIdx> {
        if Identifier::is_url(entry) {
            return Err(Error::EntryNotFound(entry.to_string()));
        }
        let root = self.graph.root();
        let root_dir = self.graph.packet(root).dir.clone();

        let local = if Identifier::is_relative(entry) {
            local::join_relative("", entry)
        } else {
            local::locate(self.runtime, &root_dir, entry)
                .await
                .map(|_| entry.to_string())
        };

        match local {
            Some(rel) => self.resolve_in_packet(root, &rel).await,
            None if Identifier::is_relative(entry) => Err(Error::EntryNotFound(entry.to_string())),
            None => self.resolve_bare(root, entry).await,
        }
    }

    async fn walk(&mut self, start: ModuleIdx) -> Result<()> {
        let mut visited = FxHashSet::default();
        let mut stack = vec![start];

        while let Some(idx) = stack.pop() {
            if !visited.insert(idx) {
                continue;
            }
            if self.graph.module(idx).state == ModuleState::Unvisited {
                self.visit(idx).await?;
            }
            let node = self.graph.module(idx);
            stack.extend(
                node.children
                    .iter()
                    .chain(&node.dynamic_children)
                    .rev()
                    .copied(),
            );
        }
        Ok(())
    }

    /// Read one module, scan its imports and resolve each of them.
    async fn visit(&mut self, idx: ModuleIdx) -> Result<()> {
        self.graph.module_mut(idx).state = ModuleState::Resolving;

        let Some(path) = self.graph.module(idx).file_path.clone() else {
            self.graph.module_mut(idx).state = ModuleState::Resolved;
            return Ok(());
        };

        let source = match self.runtime.read_file(&path).await {
            Ok(bytes) => bytes,
            Err(err) => {
                self.stub_out(idx, &err);
                return Ok(());
            }
        };

        let kind = SourceKind::from_path(&path);
        let imports = match std::str::from_utf8(&source) {
            Ok(text) => kind.parse_imports(&path, text),
            Err(_) => Default::default(),
        };

        {
            let node = self.graph.module_mut(idx);
            node.kind = kind;
            node.source = source.into();
        }

        let mut children = Vec::with_capacity(imports.static_imports.len());
        for specifier in &imports.static_imports {
            children.push(self.resolve_import(idx, specifier).await?);
        }
        let mut dynamic_children = Vec::with_capacity(imports.dynamic_imports.len());
        for specifier in &imports.dynamic_imports {
            dynamic_children.push(self.resolve_import(idx, specifier).await?);
        }

        let node = self.graph.module_mut(idx);
        debug!(
            id = %node.id,
            static_imports = children.len(),
            dynamic_imports = dynamic_children.len(),
            "resolved module"
        );
        node.static_imports = imports.static_imports;
        node.dynamic_imports = imports.dynamic_imports;
        node.children = children;
        node.dynamic_children = dynamic_children;
        node.state = ModuleState::Resolved;
        Ok(())
    }

    fn stub_out(&mut self, idx: ModuleIdx, err: &RuntimeError) {
        let id = self.graph.module(idx).id.clone();
        let node = self.graph.module_mut(idx);
        node.kind = SourceKind::Stub;
        node.state = ModuleState::Resolved;
        let message = match err {
            RuntimeError::FileNotFound(path) => format!("{} does not exist", path.display()),
            other => other.to_string(),
        };
        self.graph.push_diagnostic(
            Diagnostic::new(DiagnosticKind::UnresolvedImport, message).with_module(id),
        );
    }

    /// Resolve one import of `from` to a module, registering it if new.
    pub async fn resolve_import(&mut self, from: ModuleIdx, specifier: &str) -> Result<ModuleIdx> {
        trace!(from = %self.graph.module(from).id, specifier, "resolving import");

        if Identifier::is_url(specifier) {
            return Ok(self.graph.add_module(ModuleNode::external(specifier), None));
        }

        let Some(packet) = self.graph.module(from).packet else {
            return Ok(self.unresolved(specifier));
        };

        if Identifier::is_relative(specifier) {
            let from_rel = self.rel_path(from, packet);
            return match local::join_relative(&from_rel, specifier) {
                Some(rel) => self.resolve_in_packet(packet, &rel).await,
                None => Ok(self.unresolved(specifier)),
            };
        }

        self.resolve_bare(packet, specifier).await
    }

    async fn resolve_bare(&mut self, scope: PacketIdx, specifier: &str) -> Result<ModuleIdx> {
        let ident = Identifier::parse(specifier);
        let version = match ident.version.clone() {
            Some(version) => Some(version),
            None => self.lookup_version(scope, &ident.name),
        };

        let target = version
            .and_then(|version| self.graph.get_or_create_packet(&ident.name, &version, scope));
        let Some(target) = target else {
            return Ok(self.unresolved(specifier));
        };

        let rel = if ident.subpath.is_empty() {
            self.graph.packet(target).main.clone()
        } else {
            ident.subpath
        };
        self.resolve_in_packet(target, &rel).await
    }

    /// Nearest-scope-wins: the packet's own dependencies, then each parent's.
    fn lookup_version(&self, scope: PacketIdx, name: &str) -> Option<String> {
        self.graph.scope_chain(scope).find_map(|idx| {
            let packet = self.graph.packet(idx);
            if packet.name == name {
                return Some(packet.version.clone());
            }
            packet.dependencies.get(name).cloned()
        })
    }

    async fn resolve_in_packet(&mut self, packet: PacketIdx, rel: &str) -> Result<ModuleIdx> {
        if let Some(idx) = self.graph.packet(packet).lookup(rel) {
            return Ok(idx);
        }

        let dir = self.graph.packet(packet).dir.clone();
        let target = local::locate(self.runtime, &dir, rel)
            .await
            .unwrap_or_else(|| rel.to_string());

        if target != rel {
            self.graph
                .packet_mut(packet)
                .aliases
                .insert(rel.to_string(), target.clone());
        }
        if let Some(idx) = self.graph.packet(packet).lookup(&target) {
            return Ok(idx);
        }

        let id = self.graph.packet(packet).module_id(&target);
        let path = dir.join(&target);
        let kind = SourceKind::from_path(Path::new(&target));
        Ok(self
            .graph
            .add_module(ModuleNode::new(id, Some(path), kind, Some(packet)), Some(&target)))
    }

    /// Register (once) an empty stub for a specifier nothing matched.
    fn unresolved(&mut self, specifier: &str) -> ModuleIdx {
        if let Some(idx) = self.graph.module_by_id(specifier) {
            return idx;
        }
        self.graph.push_diagnostic(
            Diagnostic::new(
                DiagnosticKind::UnresolvedImport,
                format!("{specifier} is not installed in any enclosing scope"),
            )
            .with_module(specifier),
        );
        let mut node = ModuleNode::new(specifier.to_string(), None, SourceKind::Stub, None);
        node.state = ModuleState::Resolved;
        self.graph.add_module(node, None)
    }

    fn rel_path(&self, idx: ModuleIdx, packet: PacketIdx) -> String {
        let packet = self.graph.packet(packet);
        let prefix = format!("{}/{}/", packet.name, packet.version);
        self.graph
            .module(idx)
            .id
            .strip_prefix(&prefix)
            .unwrap_or_default()
            .to_string()
    }
}

/// Resolve `entries` against `graph` with a fresh [`Resolver`].
pub async fn resolve_entries(
    runtime: &dyn Runtime,
    graph: &mut ModuleGraph,
    entries: &[String],
) -> Result<Vec<ModuleIdx>> {
    Resolver::new(runtime, graph).resolve_all(entries).await
}
