//! Error handling for the bale CLI.
//!
//! The hierarchy:
//! - **Top-level errors** (`CliError`) represent broad categories of failures
//! - **Domain-specific errors** (`ConfigError`, `BuildError`) carry actionable hints
//! - Library errors from `bale-bundler` pass through unchanged so their
//!   `miette::Diagnostic` codes and help survive to the terminal
//!
//! # Example
//!
//! ```rust,no_run
//! use bale_cli::error::{Result, ResultExt};
//! use std::path::Path;
//!
//! fn read_manifest(root: &Path) -> Result<String> {
//!     let path = root.join("package.json");
//!     std::fs::read_to_string(&path)
//!         .with_path(&path)
//!         .with_hint("bale needs an installed project to build")
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

mod miette;

pub use self::miette::{build_error_to_miette, bundler_error_to_miette, cli_error_to_miette};

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration-related errors (file not found, invalid values, etc.)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Failures around the build that the bundler itself does not report
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// Errors from the bundler, including transpile failures with their chain
    #[error(transparent)]
    Bundler(#[from] bale_bundler::Error),

    /// Invalid command-line arguments or options
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// File or directory not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// I/O errors from file system operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File watching errors
    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// Generic errors with custom messages
    #[error("{0}")]
    Custom(String),
}

/// Configuration-specific errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested config file doesn't exist
    #[error("Config file not found: {}\n\nHint: Create a bale.config.json file or fix the --config path", .0.display())]
    NotFound(PathBuf),

    /// The merged configuration is structurally valid but unusable
    #[error("{0}\n\nHint: Entries can be passed as arguments or listed under \"entries\" in bale.config.json")]
    Invalid(String),

    /// A configuration source holds a value of the wrong shape
    #[error("Invalid value for '{field}': {value}\n\nHint: {hint}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The invalid value
        value: String,
        /// Helpful hint for correct values
        hint: String,
    },

    /// I/O error while reading config
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
}

/// Build process errors raised by the CLI itself.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The project root has no package.json
    #[error("No package.json in {}\n\nHint: Run bale from the project directory or pass --root <dir>", .0.display())]
    MissingManifest(PathBuf),

    /// Output directory is not a safe place to write
    #[error("Output directory is not writable: {}\n\nHint: Check directory permissions or specify a different --out-dir", .0.display())]
    OutputNotWritable(PathBuf),

    /// Generic build error
    #[error("{0}")]
    Custom(String),
}

/// Result type alias using `CliError` as the default error type.
pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Extension trait for adding context to `Result` types.
pub trait ResultExt<T> {
    /// Turn a not-found I/O error into [`CliError::FileNotFound`] for `path`.
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T>;

    /// Append a hint to the error message.
    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T>;

    /// Prefix the error message.
    fn context(self, msg: impl std::fmt::Display) -> Result<T>;
}

impl<T, E: Into<CliError>> ResultExt<T> for std::result::Result<T, E> {
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T> {
        self.map_err(|e| match e.into() {
            CliError::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound => {
                CliError::FileNotFound(path.as_ref().to_path_buf())
            }
            other => other,
        })
    }

    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{}\n\nHint: {}", err, hint))
        })
    }

    fn context(self, msg: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{}: {}", msg, err))
        })
    }
}
