//! bale CLI - build and watch component bundles.
//!
//! The binary is a thin layer over [`bale_bundler::BuildSession`]:
//!
//! - [`cli`] - Argument parsing with clap
//! - [`config`] - Layered configuration (CLI > `BALE_*` env > `bale.config.json` > defaults)
//! - [`commands`] - `build` and `watch`
//! - [`watch`] - Debounced filesystem watcher feeding `BuildSession::reload`
//! - [`error`] - Error types with actionable hints, rendered through miette
//! - [`logger`] / [`ui`] - tracing subscriber and terminal output
//!
//! ```rust
//! use bale_cli::{error::Result, logger};
//!
//! fn main() -> Result<()> {
//!     logger::init_logger(false, false, false);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logger;
pub mod ui;
pub mod watch;

pub use error::{BuildError, CliError, ConfigError, Result, ResultExt};
