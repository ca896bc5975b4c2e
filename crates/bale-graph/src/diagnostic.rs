//! Recoverable build diagnostics.
//!
//! Anything that degrades the build without failing it is recorded here and
//! logged; fatal problems travel as [`crate::Error`] instead.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    /// An import that could not be located; replaced with an empty stub.
    UnresolvedImport,
    /// A dependency declared in package.json with no installed copy.
    MissingDependency,
    /// A cache entry that failed to decode; treated as a miss.
    CacheCorruption,
    /// The cache salt changed; the whole store was purged.
    SaltMismatch,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::UnresolvedImport => "unresolved import",
            Self::MissingDependency => "missing dependency",
            Self::CacheCorruption => "cache corruption",
            Self::SaltMismatch => "salt mismatch",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    /// Id of the module the diagnostic was raised for, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            module: None,
        }
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.module {
            Some(module) => write!(f, "{} in {module}: {}", self.kind, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}
