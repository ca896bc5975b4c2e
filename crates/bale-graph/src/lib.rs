//! # bale-graph
//!
//! Version-aware module graph for component bundles.
//!
//! ## Overview
//!
//! `bale-graph` turns an installed package tree plus a set of entry modules
//! into a graph of [`ModuleNode`]s grouped into [`Packet`]s (one per resolved
//! `name@version`). The same package name may be installed at several versions
//! at different depths; resolution follows the installation layout, so
//! `require('react')` inside a package sees the copy nearest to it.
//!
//! ```text
//! DependencyTree ──flatten──▶ FlatMap ─┐
//!                                      ▼
//! entries ──▶ Resolver ──▶ ModuleGraph { packets[], modules[] } ──▶ Lock
//!                ▲
//!             Runtime (read / exists / list)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bale_graph::{DependencyTree, ModuleGraph, NativeRuntime, Resolver};
//! use std::path::Path;
//!
//! # async fn run() -> bale_graph::Result<()> {
//! let runtime = NativeRuntime::new();
//! let (tree, _diagnostics) = DependencyTree::load(&runtime, Path::new("./app")).await?;
//! let mut graph = ModuleGraph::new(&tree);
//! let entry = Resolver::new(&runtime, &mut graph).resolve("./home.js").await?;
//! println!("{} modules reachable", graph.static_closure([entry]).len());
//! # Ok(())
//! # }
//! ```
//!
//! Cross references between modules are arena indices ([`ModuleIdx`],
//! [`PacketIdx`]), so import cycles need no reference counting.

pub mod diagnostic;
pub mod graph;
pub mod identifier;
pub mod lock;
pub mod module;
pub mod package_json;
pub mod packet;
pub mod resolver;
pub mod runtime;
pub mod source_kind;
pub mod transpile;
pub mod tree;

pub use diagnostic::{Diagnostic, DiagnosticKind};
pub use graph::ModuleGraph;
pub use identifier::Identifier;
pub use lock::{LoaderConfig, Lock, LockEntry};
pub use module::{CachedOutput, ModuleIdx, ModuleNode, ModuleState};
pub use package_json::{DEFAULT_MAIN, PackageJson, extract_package_name};
pub use packet::{Packet, PacketIdx};
pub use resolver::{Resolver, resolve_entries};
pub use source_kind::{OutputFormat, ParsedImports, SourceKind};
pub use transpile::{
    JsonTranspiler, PassthroughTranspiler, TranspileOutput, Transpiler, TranspilerRegistry,
};
pub use tree::{DependencyTree, FlatEntry, FlatMap, flatten};

pub use runtime::{Runtime, RuntimeError, RuntimeResult};

#[cfg(not(target_family = "wasm"))]
pub use runtime::native::NativeRuntime;

#[cfg(any(test, feature = "test-utils"))]
pub use runtime::memory::MemoryRuntime;

/// Error types for graph operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A package.json that couldn't be read or parsed.
    #[error("Invalid package: {0}")]
    InvalidPackage(String),

    /// Filesystem capability failure.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// An entry specifier that resolved to nothing.
    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    /// A module required by an entry failed to transpile.
    ///
    /// `chain` runs from the requesting entry to the failing module.
    #[error("Failed to transpile {id}: {message}")]
    TranspileFailure {
        id: String,
        chain: Vec<String>,
        message: String,
    },
}

/// Result type alias for graph operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests;
