//! Native `Runtime` backed by `std::fs`.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::task;

use super::{Runtime, RuntimeError, RuntimeResult};

/// Native filesystem runtime.
///
/// Blocking reads run on tokio's blocking pool so the resolver can be driven
/// from async code without stalling the executor.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeRuntime;

impl NativeRuntime {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Runtime for NativeRuntime {
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        let path = path.to_path_buf();

        task::spawn_blocking(move || {
            std::fs::read(&path).map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    RuntimeError::FileNotFound(path.clone())
                } else {
                    RuntimeError::Io(format!("Failed to read {}: {}", path.display(), e))
                }
            })
        })
        .await
        .map_err(|e| RuntimeError::Other(format!("Task join error: {}", e)))?
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    async fn read_dir(&self, path: &Path) -> RuntimeResult<Vec<String>> {
        let path = path.to_path_buf();

        task::spawn_blocking(move || {
            let entries = std::fs::read_dir(&path).map_err(|e| {
                RuntimeError::Io(format!("Failed to read dir {}: {}", path.display(), e))
            })?;

            let mut names = Vec::new();
            for entry in entries {
                let entry = entry.map_err(|e| RuntimeError::Io(e.to_string()))?;
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
            names.sort();
            Ok(names)
        })
        .await
        .map_err(|e| RuntimeError::Other(format!("Task join error: {}", e)))?
    }

    fn get_cwd(&self) -> RuntimeResult<PathBuf> {
        std::env::current_dir()
            .map_err(|e| RuntimeError::Io(format!("Failed to get current directory: {}", e)))
    }
}
