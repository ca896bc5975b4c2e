use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::identifier::Identifier;
use crate::module::ModuleIdx;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PacketIdx(pub(crate) u32);

impl PacketIdx {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PacketIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// A resolved `(name, version)` with its own module files and dependency scope.
#[derive(Debug, Clone)]
pub struct Packet {
    pub name: String,
    pub version: String,
    pub dir: PathBuf,
    pub main: String,
    pub dependencies: BTreeMap<String, String>,
    /// Packet-relative path → module. A module belongs to exactly one packet.
    pub modules: BTreeMap<String, ModuleIdx>,
    /// Extensionless and directory imports → the concrete relative path.
    pub aliases: BTreeMap<String, String>,
    /// Packet that first reached this one; the next scope for bare lookups.
    pub parent: Option<PacketIdx>,
}

impl Packet {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        dir: PathBuf,
        main: impl Into<String>,
        dependencies: BTreeMap<String, String>,
        parent: Option<PacketIdx>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            dir,
            main: main.into(),
            dependencies,
            modules: BTreeMap::new(),
            aliases: BTreeMap::new(),
            parent,
        }
    }

    pub fn module_id(&self, rel_path: &str) -> String {
        Identifier::module_id(&self.name, &self.version, rel_path)
    }

    /// Look up a packet-relative path, following aliases.
    pub fn lookup(&self, rel_path: &str) -> Option<ModuleIdx> {
        self.modules.get(rel_path).copied().or_else(|| {
            self.aliases
                .get(rel_path)
                .and_then(|target| self.modules.get(target))
                .copied()
        })
    }

    /// `name@version`, for logs.
    pub fn label(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }
}
