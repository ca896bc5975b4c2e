//! Runtime specifier resolution.
//!
//! Mirrors the build-time resolver using only what `loaderConfig.json`
//! carries: versions come from the lock's dependency lists, searched
//! nearest scope first, and extensionless imports go through the lock's
//! aliases. Each lock entry names the packet the build treated as its
//! parent, so the runtime walks the same scope chain the build did no matter
//! which page reached the packet first.

use bale_graph::resolver::local::join_relative;
use bale_graph::{Identifier, LoaderConfig, Lock};
use rustc_hash::FxHashSet;
use tracing::trace;

/// `(name, version)` of a packet.
pub type PacketKey = (String, String);

#[derive(Debug, Clone)]
pub struct ScopeResolver {
    lock: Lock,
    root: PacketKey,
    base_url: String,
}

impl ScopeResolver {
    pub fn new(config: &LoaderConfig) -> Self {
        let (name, version) = config.root();
        Self {
            lock: config.lock.clone(),
            root: (name.to_string(), version.to_string()),
            base_url: config.base_url.clone(),
        }
    }

    pub fn root(&self) -> &PacketKey {
        &self.root
    }

    /// Resolve `specifier` as imported by module `from` (`None` for a
    /// top-level import) to a module id.
    ///
    /// URLs resolve to themselves. Anything that can't be resolved falls back
    /// to the specifier itself, which is the id the build gives unresolved
    /// imports.
    pub fn resolve(&self, from: Option<&str>, specifier: &str) -> String {
        let resolved = self.try_resolve(from, specifier);
        trace!(from, specifier, resolved = resolved.as_deref(), "resolved specifier");
        resolved.unwrap_or_else(|| specifier.to_string())
    }

    fn try_resolve(&self, from: Option<&str>, specifier: &str) -> Option<String> {
        if Identifier::is_url(specifier) {
            return Some(specifier.to_string());
        }
        let (scope, from_rel) = self.scope_of(from);

        if Identifier::is_relative(specifier) {
            let rel = join_relative(&from_rel, specifier)?;
            return Some(self.module_id(&scope, &rel));
        }
        if from.is_none() && self.is_root_module(specifier) {
            return Some(self.module_id(&scope, specifier));
        }

        let ident = Identifier::parse(specifier);
        let version = match ident.version {
            Some(version) => version,
            None => self.lookup_version(&scope, &ident.name)?,
        };
        let target = (ident.name, version);
        let entry = self.lock.get(&target.0, &target.1)?;
        let rel = if ident.subpath.is_empty() {
            entry.main().to_string()
        } else {
            ident.subpath
        };
        Some(self.module_id(&target, &rel))
    }

    /// The packet a module id belongs to, and its packet-relative path.
    fn scope_of(&self, from: Option<&str>) -> (PacketKey, String) {
        let Some(id) = from else {
            return (self.root.clone(), String::new());
        };
        let ident = Identifier::parse(id);
        match ident.version {
            Some(version) if self.lock.get(&ident.name, &version).is_some() => {
                ((ident.name, version), ident.subpath)
            }
            _ => (self.root.clone(), String::new()),
        }
    }

    /// A top-level import naming a file of the root package.
    fn is_root_module(&self, specifier: &str) -> bool {
        self.lock.get(&self.root.0, &self.root.1).is_some_and(|entry| {
            entry.manifest.as_ref().is_some_and(|m| m.contains_key(specifier))
                || entry.alias.as_ref().is_some_and(|a| a.contains_key(specifier))
        })
    }

    /// Nearest-scope-wins over the lock's parent chain. Packets without a
    /// recorded parent fall back to the root scope.
    fn lookup_version(&self, scope: &PacketKey, name: &str) -> Option<String> {
        let mut seen = FxHashSet::default();
        let mut current = (scope.0.as_str(), scope.1.as_str());
        while seen.insert(current) {
            if current.0 == name {
                return Some(current.1.to_string());
            }
            if let Some(version) = self
                .lock
                .get(current.0, current.1)
                .and_then(|entry| entry.dependencies.get(name))
            {
                return Some(version.clone());
            }
            current = match self.lock.parent_of(current.0, current.1) {
                Some(parent) => parent,
                None => (self.root.0.as_str(), self.root.1.as_str()),
            };
        }
        None
    }

    fn module_id(&self, packet: &PacketKey, rel: &str) -> String {
        let concrete = self
            .lock
            .get(&packet.0, &packet.1)
            .and_then(|entry| entry.alias.as_ref())
            .and_then(|aliases| aliases.get(rel))
            .map(String::as_str)
            .unwrap_or(rel);
        Identifier::module_id(&packet.0, &packet.1, concrete)
    }

    /// Where the script defining `id` is fetched from: the bundle the lock
    /// manifest lists for it, else `baseUrl + id`.
    pub fn url_for(&self, id: &str) -> String {
        if Identifier::is_url(id) {
            return id.to_string();
        }
        let ident = Identifier::parse(id);
        let file = ident.version.as_deref().and_then(|version| {
            self.lock
                .get(&ident.name, version)
                .and_then(|entry| entry.manifest.as_ref())
                .and_then(|manifest| manifest.get(&ident.subpath))
        });
        match file {
            Some(file) => format!("{}{file}", self.base_url),
            None => format!("{}{id}", self.base_url),
        }
    }
}
