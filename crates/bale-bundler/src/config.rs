//! Build configuration.
//!
//! `BuildConfig` is plain serde data so front ends can layer it from files,
//! environment and flags; it is validated once before a session starts.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Everything a build needs besides the filesystem and transpilers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuildConfig {
    /// Project directory containing the root package.json.
    pub root: PathBuf,
    /// Bundle roots, relative to `root` or bare specifiers.
    pub entries: Vec<String>,
    /// Modules loaded before any entry, in order.
    pub preload: Vec<String>,
    /// Modules kept out of eager bundles and fetched on demand.
    pub lazyload: Vec<String>,
    /// Package names shipped as standalone bundles.
    pub isolate: Vec<String>,
    /// Output directory, relative to `root` unless absolute.
    pub out_dir: PathBuf,
    /// Transpile cache directory; `None` disables persistence.
    pub cache_dir: Option<PathBuf>,
    /// URL prefix the loader fetches bundles from.
    pub base_url: String,
    /// Emit `.map` files next to bundles.
    pub sourcemap: bool,
    /// Free-form transpiler options. Part of the cache salt.
    pub transpiler_options: serde_json::Value,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            entries: Vec::new(),
            preload: Vec::new(),
            lazyload: Vec::new(),
            isolate: Vec::new(),
            out_dir: PathBuf::from("dist"),
            cache_dir: Some(PathBuf::from(".bale-cache")),
            base_url: "/".to_string(),
            sourcemap: true,
            transpiler_options: serde_json::Value::Null,
        }
    }
}

impl BuildConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn entry(mut self, entry: impl Into<String>) -> Self {
        self.entries.push(entry.into());
        self
    }

    pub fn preload(mut self, specifier: impl Into<String>) -> Self {
        self.preload.push(specifier.into());
        self
    }

    pub fn lazyload(mut self, specifier: impl Into<String>) -> Self {
        self.lazyload.push(specifier.into());
        self
    }

    pub fn isolate(mut self, package: impl Into<String>) -> Self {
        self.isolate.push(package.into());
        self
    }

    pub fn out_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.out_dir = dir.into();
        self
    }

    pub fn cache_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.cache_dir = dir;
        self
    }

    /// Reject unusable configurations and normalize the rest.
    pub fn validate(mut self) -> Result<Self> {
        if self.entries.is_empty() {
            return Err(Error::InvalidConfig(
                "at least one entry is required".to_string(),
            ));
        }
        if let Some(both) = self.preload.iter().find(|p| self.lazyload.contains(p)) {
            return Err(Error::InvalidConfig(format!(
                "'{both}' is listed in both preload and lazyload"
            )));
        }
        if !self.base_url.ends_with('/') {
            self.base_url.push('/');
        }
        Ok(self)
    }

    pub fn out_dir_path(&self) -> PathBuf {
        resolve_against(&self.root, &self.out_dir)
    }

    pub fn cache_dir_path(&self) -> Option<PathBuf> {
        self.cache_dir
            .as_deref()
            .map(|dir| resolve_against(&self.root, dir))
    }
}

fn resolve_against(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
