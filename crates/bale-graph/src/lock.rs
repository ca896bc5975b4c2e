//! Runtime-facing manifests.
//!
//! [`Lock`] is the version-resolution table the loader runtime consults;
//! [`LoaderConfig`] is the `loaderConfig.json` document that carries it.
//! Both are rebuilt wholesale on every build.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::graph::ModuleGraph;
use crate::package_json::DEFAULT_MAIN;
use crate::tree::FlatMap;

/// Lock data for one `(name, version)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,
    /// Packet-relative module path → emitted bundle file containing it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<BTreeMap<String, String>>,
    /// Extensionless/directory import → concrete packet-relative path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<BTreeMap<String, String>>,
    /// Packet whose scope is searched next, as `name/version`. Set for every
    /// packet the build reached except the root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl LockEntry {
    pub fn main(&self) -> &str {
        self.main.as_deref().unwrap_or(DEFAULT_MAIN)
    }
}

/// `name → version → LockEntry`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lock(pub BTreeMap<String, BTreeMap<String, LockEntry>>);

impl Lock {
    /// Derive the lock from a resolved graph: every installed pair from the
    /// flat map, plus the aliases recorded while resolving.
    pub fn from_graph(graph: &ModuleGraph) -> Self {
        let mut lock = Lock::default();
        for (name, versions) in &graph.flat().0 {
            for (version, entry) in versions {
                lock.0.entry(name.clone()).or_default().insert(
                    version.clone(),
                    LockEntry {
                        main: entry.main.clone(),
                        dependencies: entry.dependencies.clone(),
                        manifest: None,
                        alias: None,
                        parent: None,
                    },
                );
            }
        }

        for (_, packet) in graph.packets() {
            let entry = lock
                .0
                .entry(packet.name.clone())
                .or_default()
                .entry(packet.version.clone())
                .or_default();
            if !packet.aliases.is_empty() {
                entry.alias = Some(packet.aliases.clone());
            }
            entry.parent = packet.parent.map(|idx| {
                let parent = graph.packet(idx);
                format!("{}/{}", parent.name, parent.version)
            });
        }
        lock
    }

    pub fn get(&self, name: &str, version: &str) -> Option<&LockEntry> {
        self.0.get(name).and_then(|versions| versions.get(version))
    }

    /// The parent recorded for `name@version`, split into `(name, version)`.
    pub fn parent_of(&self, name: &str, version: &str) -> Option<(&str, &str)> {
        self.get(name, version)?.parent.as_deref()?.rsplit_once('/')
    }

    pub fn get_mut(&mut self, name: &str, version: &str) -> Option<&mut LockEntry> {
        self.0.get_mut(name).and_then(|versions| versions.get_mut(version))
    }

    /// Record that `rel_path` of `name@version` ships in `file`.
    pub fn record_output(&mut self, name: &str, version: &str, rel_path: &str, file: &str) {
        let entry = self
            .0
            .entry(name.to_string())
            .or_default()
            .entry(version.to_string())
            .or_default();
        entry
            .manifest
            .get_or_insert_with(BTreeMap::new)
            .insert(rel_path.to_string(), file.to_string());
    }
}

/// The `loaderConfig.json` document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoaderConfig {
    /// Root packet as `name/version`.
    pub package: String,
    pub modules: FlatMap,
    pub lock: Lock,
    pub base_url: String,
    /// Module ids executed before any entry, in order.
    #[serde(default)]
    pub preload: Vec<String>,
}

impl LoaderConfig {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Split the root package into `(name, version)`.
    pub fn root(&self) -> (&str, &str) {
        self.package
            .rsplit_once('/')
            .unwrap_or((self.package.as_str(), ""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loader_config_wire_shape() {
        let mut lock = Lock::default();
        lock.0.entry("app".into()).or_default().insert(
            "1.0.0".into(),
            LockEntry {
                dependencies: BTreeMap::from([("react".into(), "17.0.2".into())]),
                ..Default::default()
            },
        );
        lock.record_output("app", "1.0.0", "home.js", "home.1a2b3c4d.js");

        let config = LoaderConfig {
            package: "app/1.0.0".into(),
            modules: FlatMap::default(),
            lock,
            base_url: "/assets/".into(),
            preload: vec!["app/1.0.0/preload.js".into()],
        };

        let json: serde_json::Value = serde_json::from_str(&config.to_json().unwrap()).unwrap();
        assert_eq!(json["baseUrl"], "/assets/");
        assert_eq!(json["lock"]["app"]["1.0.0"]["dependencies"]["react"], "17.0.2");
        assert_eq!(json["lock"]["app"]["1.0.0"]["manifest"]["home.js"], "home.1a2b3c4d.js");
        assert!(json["lock"]["app"]["1.0.0"].get("main").is_none());
        assert!(json["lock"]["app"]["1.0.0"].get("parent").is_none());
        assert_eq!(config.root(), ("app", "1.0.0"));

        let back = LoaderConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_parent_of_splits_scoped_names() {
        let mut lock = Lock::default();
        lock.0.entry("lib".into()).or_default().insert(
            "2.0.0".into(),
            LockEntry {
                parent: Some("@acme/widget/1.0.0".into()),
                ..Default::default()
            },
        );
        assert_eq!(lock.parent_of("lib", "2.0.0"), Some(("@acme/widget", "1.0.0")));
        assert_eq!(lock.parent_of("lib", "3.0.0"), None);
    }

    #[test]
    fn test_scoped_root() {
        let config = LoaderConfig {
            package: "@acme/site/2.0.0".into(),
            ..Default::default()
        };
        assert_eq!(config.root(), ("@acme/site", "2.0.0"));
    }
}
