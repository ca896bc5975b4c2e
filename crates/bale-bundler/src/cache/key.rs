//! Digests and salt computation using BLAKE3.

use blake3::Hasher;

use bale_graph::TranspilerRegistry;

/// Current cache format version. Increment when the entry layout changes.
pub const CACHE_FORMAT_VERSION: u32 = 1;

/// Hex characters kept from a source digest (128 bits).
const DIGEST_HEX_LEN: usize = 32;

/// 128-bit BLAKE3 digest of raw source bytes, as hex.
pub fn digest(source: &[u8]) -> String {
    let mut hex = blake3::hash(source).to_hex().to_string();
    hex.truncate(DIGEST_HEX_LEN);
    hex
}

/// Fingerprint of the toolchain configuration a cache was built under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Salt(String);

impl Salt {
    /// Hash of the cache format version, every registered transpiler's
    /// `(kind, name, version, options)` and the build-wide transpiler options.
    pub fn compute(transpilers: &TranspilerRegistry, options: &serde_json::Value) -> Self {
        let mut hasher = Hasher::new();

        hasher.update(&CACHE_FORMAT_VERSION.to_le_bytes());

        for (kind, name, version, transpiler_options) in transpilers.salt_inputs() {
            hasher.update(format!("{kind:?}").as_bytes());
            hasher.update(b"\0");
            hasher.update(name.as_bytes());
            hasher.update(b"\0");
            hasher.update(version.as_bytes());
            hasher.update(b"\0");
            hasher.update(transpiler_options.to_string().as_bytes());
            hasher.update(b"\n");
        }

        // serde_json::Value maps are ordered, so this is deterministic.
        hasher.update(options.to_string().as_bytes());

        Self(hasher.finalize().to_hex().to_string())
    }

    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Salt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
