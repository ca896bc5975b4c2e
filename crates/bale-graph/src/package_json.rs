//! package.json parsing.
//!
//! Only the fields that influence resolution are read: identity, entry point
//! and production dependencies.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::runtime::Runtime;
use crate::{Error, Result};

/// Maximum allowed size for package.json files (10MB)
const MAX_PACKAGE_JSON_SIZE: usize = 10 * 1024 * 1024;

/// Conventional entry used when a package doesn't declare `main`.
pub const DEFAULT_MAIN: &str = "index.js";

/// Parsed package.json structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageJson {
    /// Package name
    pub name: Option<String>,
    /// Package version
    pub version: Option<String>,
    /// Entry point relative to the package directory
    pub main: Option<String>,
    /// Browser field; only the string form (an alternate main) is honored
    #[serde(default, deserialize_with = "browser_main")]
    pub browser: Option<String>,
    /// Production dependencies
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    /// File path this was loaded from
    #[serde(skip)]
    pub path: PathBuf,
}

fn browser_main<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_str().map(str::to_string))
}

impl PackageJson {
    /// Load package.json from a specific path using the provided runtime.
    pub async fn from_path(runtime: &dyn Runtime, path: &Path) -> Result<Self> {
        let content_bytes = runtime.read_file(path).await?;

        if content_bytes.len() > MAX_PACKAGE_JSON_SIZE {
            return Err(Error::InvalidPackage(format!(
                "{} exceeds maximum size of {}MB",
                path.display(),
                MAX_PACKAGE_JSON_SIZE / 1024 / 1024
            )));
        }

        let mut pkg = Self::parse(&content_bytes).map_err(|e| {
            Error::InvalidPackage(format!("Invalid package.json at {}: {e}", path.display()))
        })?;
        pkg.path = path.to_path_buf();
        Ok(pkg)
    }

    /// Parse package.json bytes.
    pub fn parse(bytes: &[u8]) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// The effective entry: `browser` (string form) wins over `main`.
    pub fn entry(&self) -> &str {
        self.browser
            .as_deref()
            .or(self.main.as_deref())
            .map(|m| m.trim_start_matches("./"))
            .unwrap_or(DEFAULT_MAIN)
    }

    /// Directory containing this package.json.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new(""))
    }
}

/// Extract the package name from an import specifier.
///
/// ```
/// # use bale_graph::extract_package_name;
/// assert_eq!(extract_package_name("@babel/core/lib/index"), "@babel/core");
/// assert_eq!(extract_package_name("lodash/fp"), "lodash");
/// ```
pub fn extract_package_name(specifier: &str) -> &str {
    if specifier.is_empty() {
        return specifier;
    }

    if specifier.starts_with('@') {
        if let Some(first_slash) = specifier.find('/') {
            if let Some(second_slash) = specifier[first_slash + 1..].find('/') {
                return &specifier[..first_slash + 1 + second_slash];
            }
        }
        return specifier;
    }

    match specifier.find('/') {
        Some(slash_idx) => &specifier[..slash_idx],
        None => specifier,
    }
}
