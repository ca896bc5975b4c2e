//! In-memory `Runtime` for tests and embedders without a filesystem.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::{Runtime, RuntimeError, RuntimeResult};

/// A virtual file tree keyed by absolute path. Directories are implied by the
/// files below them.
#[derive(Debug)]
pub struct MemoryRuntime {
    files: RwLock<BTreeMap<PathBuf, Vec<u8>>>,
    cwd: PathBuf,
}

impl MemoryRuntime {
    /// Create an empty runtime rooted at `/`.
    pub fn new() -> Self {
        Self {
            files: RwLock::new(BTreeMap::new()),
            cwd: PathBuf::from("/"),
        }
    }

    /// Add (or replace) a file.
    pub fn add_file(&self, path: impl Into<PathBuf>, content: impl AsRef<[u8]>) {
        self.files
            .write()
            .insert(path.into(), content.as_ref().to_vec());
    }

    /// Builder-style [`MemoryRuntime::add_file`].
    pub fn with_file(self, path: impl Into<PathBuf>, content: impl AsRef<[u8]>) -> Self {
        self.add_file(path, content);
        self
    }

    /// Remove a file if present.
    pub fn remove_file(&self, path: &Path) {
        self.files.write().remove(path);
    }
}

impl Default for MemoryRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Runtime for MemoryRuntime {
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        self.files
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| RuntimeError::FileNotFound(path.to_path_buf()))
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.read().keys().any(|p| p.starts_with(path))
    }

    fn is_dir(&self, path: &Path) -> bool {
        let files = self.files.read();
        !files.contains_key(path) && files.keys().any(|p| p.starts_with(path))
    }

    async fn read_dir(&self, path: &Path) -> RuntimeResult<Vec<String>> {
        let files = self.files.read();
        let mut names: Vec<String> = files
            .keys()
            .filter_map(|p| p.strip_prefix(path).ok())
            .filter_map(|rest| rest.components().next())
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        names.dedup();
        Ok(names)
    }

    fn get_cwd(&self) -> RuntimeResult<PathBuf> {
        Ok(self.cwd.clone())
    }
}
