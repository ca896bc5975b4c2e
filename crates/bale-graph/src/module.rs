use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::packet::PacketIdx;
use crate::source_kind::SourceKind;

/// Index of a [`ModuleNode`] in the graph arena.
///
/// Cross-module references (including cycles) are expressed with these rather
/// than owning pointers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleIdx(pub(crate) u32);

impl ModuleIdx {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ModuleIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// Resolution progress of a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModuleState {
    /// Registered but its source hasn't been read yet.
    Unvisited,
    /// Source read; imports being resolved.
    Resolving,
    Resolved,
}

/// Transpiled output attached to a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedOutput {
    pub code: String,
    pub map: Option<String>,
    /// Digest of the source bytes this output was produced from.
    pub digest: String,
}

/// One transpilable unit.
#[derive(Debug, Clone)]
pub struct ModuleNode {
    /// `name/version/subpath`, or the bare URL/specifier for externals.
    pub id: String,
    /// Location on disk; `None` for externals.
    pub file_path: Option<PathBuf>,
    pub kind: SourceKind,
    /// Owning packet; externals and unresolved bare specifiers have none.
    pub packet: Option<PacketIdx>,
    pub static_imports: Vec<String>,
    pub dynamic_imports: Vec<String>,
    /// Resolved static imports, parallel to `static_imports`.
    pub children: Vec<ModuleIdx>,
    /// Resolved dynamic imports, parallel to `dynamic_imports`.
    pub dynamic_children: Vec<ModuleIdx>,
    pub state: ModuleState,
    pub source: Arc<[u8]>,
    pub cache: Option<CachedOutput>,
    /// Transpile failure message, set by the build.
    pub error: Option<String>,
}

impl ModuleNode {
    pub fn new(id: String, file_path: Option<PathBuf>, kind: SourceKind, packet: Option<PacketIdx>) -> Self {
        Self {
            id,
            file_path,
            kind,
            packet,
            static_imports: Vec::new(),
            dynamic_imports: Vec::new(),
            children: Vec::new(),
            dynamic_children: Vec::new(),
            state: ModuleState::Unvisited,
            source: Arc::from(Vec::new()),
            cache: None,
            error: None,
        }
    }

    pub fn external(url: &str) -> Self {
        let mut node = Self::new(url.to_string(), None, SourceKind::External, None);
        node.state = ModuleState::Resolved;
        node
    }

    pub fn is_stub(&self) -> bool {
        self.kind == SourceKind::Stub
    }

    pub fn is_external(&self) -> bool {
        self.kind == SourceKind::External
    }

    /// Forget everything learned from the module's source.
    pub fn reset(&mut self) {
        self.static_imports.clear();
        self.dynamic_imports.clear();
        self.children.clear();
        self.dynamic_children.clear();
        self.source = Arc::from(Vec::new());
        self.cache = None;
        self.error = None;
        if !self.is_external() {
            self.state = ModuleState::Unvisited;
        }
    }

    /// Static specifier paired with the module it resolved to.
    pub fn resolved_static(&self) -> impl Iterator<Item = (&str, ModuleIdx)> {
        self.static_imports
            .iter()
            .map(String::as_str)
            .zip(self.children.iter().copied())
    }
}
