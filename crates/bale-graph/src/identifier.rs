//! Module specifier parsing.
//!
//! A specifier such as `@scope/pkg/1.2.3/lib/index.js` splits into a package
//! name, an optional embedded version and the remaining subpath. Module ids
//! produced by the resolver use the same shape (`name/version/subpath`), so the
//! parser doubles as the id decoder for both the build and the loader runtime.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static VERSION_SEGMENT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\d+\.\d+\.\d+(?:[-+][0-9A-Za-z.+-]*)?$").ok());

/// Parsed module specifier: `{name, version, subpath}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier {
    pub name: String,
    pub version: Option<String>,
    pub subpath: String,
}

impl Identifier {
    /// Parse a specifier. Never fails; a missing version is a valid outcome.
    ///
    /// ```
    /// use bale_graph::Identifier;
    ///
    /// let id = Identifier::parse("@babel/runtime/7.24.0/helpers/extends.js");
    /// assert_eq!(id.name, "@babel/runtime");
    /// assert_eq!(id.version.as_deref(), Some("7.24.0"));
    /// assert_eq!(id.subpath, "helpers/extends.js");
    /// ```
    pub fn parse(specifier: &str) -> Self {
        let segments: Vec<&str> = specifier.split('/').collect();
        let name_len = if specifier.starts_with('@') && segments.len() > 1 {
            2
        } else {
            1
        };
        let name_len = name_len.min(segments.len());
        let name = segments[..name_len].join("/");
        let rest = &segments[name_len..];

        match rest.first() {
            Some(segment) if is_version(segment) => Self {
                name,
                version: Some((*segment).to_string()),
                subpath: rest[1..].join("/"),
            },
            _ => Self {
                name,
                version: None,
                subpath: rest.join("/"),
            },
        }
    }

    /// Build the canonical module id for a file inside a packet.
    pub fn module_id(name: &str, version: &str, subpath: &str) -> String {
        format!("{name}/{version}/{subpath}")
    }

    /// True for `./x` and `../x` style specifiers.
    pub fn is_relative(specifier: &str) -> bool {
        specifier.starts_with("./")
            || specifier.starts_with("../")
            || specifier == "."
            || specifier == ".."
    }

    /// True for `http://`, `https://` and protocol-relative `//` URLs.
    pub fn is_url(specifier: &str) -> bool {
        specifier.starts_with("http://")
            || specifier.starts_with("https://")
            || specifier.starts_with("//")
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if let Some(version) = &self.version {
            write!(f, "/{version}")?;
        }
        if !self.subpath.is_empty() {
            write!(f, "/{}", self.subpath)?;
        }
        Ok(())
    }
}

/// Strict `major.minor.patch[-pre][+build]` check used for embedded versions.
pub fn is_version(segment: &str) -> bool {
    VERSION_SEGMENT
        .as_ref()
        .is_some_and(|re| re.is_match(segment))
}
