#![cfg_attr(docsrs, feature(doc_cfg))]

//! # bale-bundler
//!
//! Bundle computation, transpile caching and emit on top of `bale-graph`.
//!
//! A [`BuildSession`] resolves the configured entries, preload and lazyload
//! roots into one module graph, transpiles every reachable module (in
//! parallel, through a salted on-disk cache), partitions the graph into
//! mutually exclusive bundles and writes them together with the
//! `loaderConfig.json` the browser loader starts from.
//!
//! ## Quick Start
//!
//! ```no_run
//! use bale_bundler::{BuildConfig, BuildSession};
//! use bale_graph::{NativeRuntime, TranspilerRegistry};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BuildConfig::new("./app")
//!     .entry("home.js")
//!     .preload("preload.js")
//!     .isolate("react");
//!
//! let session = BuildSession::new(
//!     config,
//!     Arc::new(NativeRuntime::new()),
//!     TranspilerRegistry::with_builtins(),
//! )?;
//! let output = session.build().await?;
//! for bundle in &output.bundles {
//!     println!("{} -> {}", bundle.name, bundle.file);
//! }
//! # Ok(()) }
//! ```

pub mod bundle;
pub mod cache;
pub mod config;
pub mod output;
pub mod session;

// Logging utilities (optional, enabled with "logging" feature)
#[cfg(feature = "logging")]
#[cfg_attr(docsrs, doc(cfg(feature = "logging")))]
pub mod logging;

#[cfg(feature = "logging")]
#[cfg_attr(docsrs, doc(cfg(feature = "logging")))]
pub use logging::{LogLevel, init_logging, init_logging_from_env};

pub use bundle::{Bundle, BundleKind, BundlePlan, BundlePolicy, compute_bundles};
pub use cache::{CacheError, ChangeSet, Salt, TranspileCache};
pub use config::BuildConfig;
pub use output::{EmittedBundle, LOADER_CONFIG_FILE, OutputFile};
pub use session::{BuildOutput, BuildSession, BuildStats};

/// Error types for bale-bundler operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid output path (e.g., directory traversal attempt).
    #[error("Invalid output path: {0}")]
    InvalidOutputPath(String),

    /// File write operation failed.
    #[error("Write failure: {0}")]
    WriteFailure(String),

    /// Output file already exists and overwrite is disabled.
    #[error("Output exists: {0}")]
    OutputExists(String),

    /// Transpile cache could not be opened or updated.
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Error from the graph crate.
    #[error(transparent)]
    Graph(#[from] bale_graph::Error),
}

/// Result type alias for bale-bundler operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Import chain for transpile failures, entry first.
    pub fn dependency_chain(&self) -> Option<&[String]> {
        match self {
            Error::Graph(bale_graph::Error::TranspileFailure { chain, .. }) => Some(chain),
            _ => None,
        }
    }
}

impl miette::Diagnostic for Error {
    fn code(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        Some(Box::new(match self {
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Io(_) => "IO_ERROR",
            Error::InvalidOutputPath(_) => "INVALID_OUTPUT_PATH",
            Error::WriteFailure(_) => "WRITE_FAILURE",
            Error::OutputExists(_) => "OUTPUT_EXISTS",
            Error::Cache(_) => "CACHE_ERROR",
            Error::Graph(bale_graph::Error::TranspileFailure { .. }) => "TRANSPILE_FAILURE",
            Error::Graph(bale_graph::Error::EntryNotFound(_)) => "ENTRY_NOT_FOUND",
            Error::Graph(_) => "GRAPH_ERROR",
        }))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(miette::Severity::Error)
    }

    fn help(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        match self {
            Error::InvalidConfig(msg) => Some(Box::new(format!(
                "Check your configuration file for syntax errors.\nError: {}",
                msg
            ))),
            Error::InvalidOutputPath(path) => Some(Box::new(format!(
                "The output path '{}' is invalid. Ensure it's within the project directory and doesn't contain '..' components.",
                path
            ))),
            Error::WriteFailure(msg) => Some(Box::new(format!(
                "Failed to write file. Check disk space and permissions.\nError: {}",
                msg
            ))),
            Error::Cache(_) => Some(Box::new(
                "Delete the cache directory to start from an empty cache.",
            )),
            Error::Graph(bale_graph::Error::TranspileFailure { chain, .. }) if !chain.is_empty() => {
                Some(Box::new(format!("Required via:\n  {}", chain.join("\n  -> "))))
            }
            Error::Graph(bale_graph::Error::EntryNotFound(entry)) => Some(Box::new(format!(
                "Entry '{}' is neither a file under the project root nor an installed package.",
                entry
            ))),
            _ => None,
        }
    }
}
