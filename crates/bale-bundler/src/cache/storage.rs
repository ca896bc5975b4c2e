//! redb-backed transpile cache.
//!
//! One table maps a module path to its last transpile result together with
//! the digest of the source it was produced from. A second table holds the
//! salt the store was written under.

use std::path::Path;

use parking_lot::Mutex;
use redb::{Database, ReadableDatabase, ReadableTableMetadata, TableDefinition};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use bale_graph::{Diagnostic, DiagnosticKind, TranspileOutput};

use super::key::{Salt, digest};

/// Cache table: module path → serialized [`CacheEntry`].
const CACHE_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("transpiled");

/// Metadata table: stores cache-wide metadata.
const METADATA_TABLE: TableDefinition<&str, &str> = TableDefinition::new("metadata");

const SALT_KEY: &str = "salt";

/// Error types for cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Cache database error.
    #[error("cache database error: {0}")]
    DatabaseError(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// IO error.
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<redb::Error> for CacheError {
    fn from(err: redb::Error) -> Self {
        CacheError::DatabaseError(err.to_string())
    }
}

impl From<redb::DatabaseError> for CacheError {
    fn from(err: redb::DatabaseError) -> Self {
        CacheError::DatabaseError(err.to_string())
    }
}

impl From<redb::TableError> for CacheError {
    fn from(err: redb::TableError) -> Self {
        CacheError::DatabaseError(err.to_string())
    }
}

impl From<redb::TransactionError> for CacheError {
    fn from(err: redb::TransactionError) -> Self {
        CacheError::DatabaseError(err.to_string())
    }
}

impl From<redb::StorageError> for CacheError {
    fn from(err: redb::StorageError) -> Self {
        CacheError::DatabaseError(err.to_string())
    }
}

impl From<redb::CommitError> for CacheError {
    fn from(err: redb::CommitError) -> Self {
        CacheError::DatabaseError(err.to_string())
    }
}

/// Result type for cache operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Stored value for one module path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Digest of the source bytes the output was produced from.
    pub digest: String,
    pub code: String,
    pub map: Option<String>,
}

/// Persistent content-addressed transpile cache.
///
/// Reads may run concurrently; redb serializes write transactions.
pub struct TranspileCache {
    db: Database,
    salt: Salt,
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl std::fmt::Debug for TranspileCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranspileCache")
            .field("salt", &self.salt)
            .finish_non_exhaustive()
    }
}

impl TranspileCache {
    /// Open or create the cache at `<cache_dir>/transpile.redb`.
    ///
    /// If the stored salt differs from `salt`, every entry is dropped before
    /// the store is returned.
    pub fn open(cache_dir: &Path, salt: Salt) -> CacheResult<Self> {
        std::fs::create_dir_all(cache_dir)?;

        let db = Database::create(cache_dir.join("transpile.redb"))?;

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(CACHE_TABLE)?;
            let _ = write_txn.open_table(METADATA_TABLE)?;
        }
        write_txn.commit()?;

        let cache = Self {
            db,
            salt,
            diagnostics: Mutex::new(Vec::new()),
        };
        cache.check_salt()?;
        Ok(cache)
    }

    fn check_salt(&self) -> CacheResult<()> {
        let stored = self.get_metadata(SALT_KEY)?;
        match stored.as_deref() {
            Some(stored) if stored == self.salt.as_hex() => {
                debug!(salt = %self.salt, "transpile cache salt matches");
            }
            Some(stored) => {
                warn!(old = stored, new = %self.salt, "transpile cache salt changed, purging");
                self.clear()?;
                self.record(Diagnostic::new(
                    DiagnosticKind::SaltMismatch,
                    "toolchain configuration changed; transpile cache purged",
                ));
                self.set_metadata(SALT_KEY, self.salt.as_hex())?;
            }
            None => {
                self.clear()?;
                self.set_metadata(SALT_KEY, self.salt.as_hex())?;
            }
        }
        Ok(())
    }

    pub fn salt(&self) -> &Salt {
        &self.salt
    }

    /// Cached output for `key` if it was produced from exactly `source`.
    ///
    /// An entry that fails to decode is removed and reported as a miss.
    pub fn get(&self, key: &str, source: &[u8]) -> CacheResult<Option<TranspileOutput>> {
        let bytes = {
            let read_txn = self.db.begin_read()?;
            let table = read_txn.open_table(CACHE_TABLE)?;
            match table.get(key)? {
                Some(value) => value.value().to_vec(),
                None => return Ok(None),
            }
        };

        let entry: CacheEntry = match bincode::deserialize(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key, error = %e, "corrupted transpile cache entry");
                self.record(
                    Diagnostic::new(
                        DiagnosticKind::CacheCorruption,
                        format!("cache entry could not be decoded: {e}"),
                    )
                    .with_module(key),
                );
                self.remove(key)?;
                return Ok(None);
            }
        };

        if entry.digest != digest(source) {
            return Ok(None);
        }
        Ok(Some(TranspileOutput {
            code: entry.code,
            map: entry.map,
        }))
    }

    /// Store `output` for `key`, tagged with the digest of `source`.
    pub fn set(&self, key: &str, source: &[u8], output: &TranspileOutput) -> CacheResult<()> {
        let entry = CacheEntry {
            digest: digest(source),
            code: output.code.clone(),
            map: output.map.clone(),
        };
        let bytes =
            bincode::serialize(&entry).map_err(|e| CacheError::SerializationError(e.to_string()))?;
        self.put_raw(key, &bytes)
    }

    pub(crate) fn put_raw(&self, key: &str, bytes: &[u8]) -> CacheResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(CACHE_TABLE)?;
            table.insert(key, bytes)?;
        }
        write_txn.commit()?;

        Ok(())
    }

    /// Remove the entry for `key`, if any.
    pub fn remove(&self, key: &str) -> CacheResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(CACHE_TABLE)?;
            table.remove(key)?;
        }
        write_txn.commit()?;

        Ok(())
    }

    /// Clear all cached entries.
    pub fn clear(&self) -> CacheResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            // Drop and recreate the table to clear it
            write_txn.delete_table(CACHE_TABLE)?;
            let _ = write_txn.open_table(CACHE_TABLE)?;
        }
        write_txn.commit()?;

        Ok(())
    }

    /// Get the number of cached entries.
    pub fn len(&self) -> CacheResult<usize> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CACHE_TABLE)?;
        Ok(table.len()? as usize)
    }

    pub fn is_empty(&self) -> CacheResult<bool> {
        Ok(self.len()? == 0)
    }

    fn set_metadata(&self, key: &str, value: &str) -> CacheResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(METADATA_TABLE)?;
            table.insert(key, value)?;
        }
        write_txn.commit()?;

        Ok(())
    }

    fn get_metadata(&self, key: &str) -> CacheResult<Option<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(METADATA_TABLE)?;

        Ok(table.get(key)?.map(|v| v.value().to_string()))
    }

    fn record(&self, diagnostic: Diagnostic) {
        self.diagnostics.lock().push(diagnostic);
    }

    /// Drain diagnostics raised since the last call.
    pub fn take_diagnostics(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.diagnostics.lock())
    }
}
