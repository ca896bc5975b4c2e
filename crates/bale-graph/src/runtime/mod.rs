//! Filesystem capability used by the resolver.
//!
//! The core never touches `std::fs` directly during resolution; everything goes
//! through [`Runtime`]. `NativeRuntime` backs it with the real filesystem and
//! `MemoryRuntime` (feature `test-utils`) with an in-memory tree.

#[cfg(not(target_family = "wasm"))]
pub mod native;

#[cfg(any(test, feature = "test-utils"))]
pub mod memory;

use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Result type for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors that can occur during runtime operations
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(String),

    /// Other runtime error
    #[error("Runtime error: {0}")]
    Other(String),
}

/// Platform runtime trait.
///
/// Reads are async so native implementations can offload blocking I/O.
/// `exists` and `is_dir` stay synchronous because the resolver probes many
/// candidate paths per import.
// WASM is single-threaded; futures there don't need to be Send.
#[cfg(target_family = "wasm")]
#[async_trait(?Send)]
pub trait Runtime: Send + Sync + std::fmt::Debug {
    /// Read a file as raw bytes
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>>;

    /// Check if a path exists (file or directory)
    fn exists(&self, path: &Path) -> bool;

    /// Check if a path is a directory
    fn is_dir(&self, path: &Path) -> bool;

    /// List entry names of a directory
    async fn read_dir(&self, path: &Path) -> RuntimeResult<Vec<String>>;

    /// Get the current working directory
    fn get_cwd(&self) -> RuntimeResult<PathBuf>;
}

#[cfg(not(target_family = "wasm"))]
#[async_trait]
pub trait Runtime: Send + Sync + std::fmt::Debug {
    /// Read a file as raw bytes
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>>;

    /// Check if a path exists (file or directory)
    fn exists(&self, path: &Path) -> bool;

    /// Check if a path is a directory
    fn is_dir(&self, path: &Path) -> bool;

    /// List entry names of a directory
    async fn read_dir(&self, path: &Path) -> RuntimeResult<Vec<String>>;

    /// Get the current working directory
    fn get_cwd(&self) -> RuntimeResult<PathBuf>;
}

/// True when `path` exists and is not a directory.
pub fn is_file(runtime: &dyn Runtime, path: &Path) -> bool {
    runtime.exists(path) && !runtime.is_dir(path)
}
