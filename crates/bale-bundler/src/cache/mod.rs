//! Persistent transpile cache for bale-bundler.
//!
//! Transpiled output is stored per module path together with the BLAKE3 digest
//! of the source it came from, so a lookup only hits when the bytes are
//! unchanged. The store is salted with the toolchain configuration.
//!
//! # Architecture
//!
//! - **Content-addressed**: entries match on `(module path, digest(source))`
//! - **Coarse invalidation**: a salt change purges the whole store
//! - **redb backend**: single database file with ACID transactions
//! - **Single-flight**: one transpile per `(id, digest)` at a time
//!
//! # Usage
//!
//! ```rust,no_run
//! use bale_bundler::cache::{Salt, TranspileCache};
//! use bale_graph::TranspilerRegistry;
//!
//! # fn example() -> Result<(), bale_bundler::cache::CacheError> {
//! let salt = Salt::compute(&TranspilerRegistry::with_builtins(), &serde_json::Value::Null);
//! let cache = TranspileCache::open(".bale-cache".as_ref(), salt)?;
//! let hit = cache.get("/app/home.js", b"require('./a');")?;
//! # let _ = hit;
//! # Ok(())
//! # }
//! ```

pub mod changes;
pub mod flight;
mod key;
mod storage;

pub use changes::{ChangeSet, affected_modules, detect_changes, is_manifest};
pub use flight::SingleFlight;
pub use key::{CACHE_FORMAT_VERSION, Salt, digest};
pub use storage::{CacheEntry, CacheError, CacheResult, TranspileCache};
