//! Command implementations for the bale CLI.
//!
//! - [`build`] - Build bundles once
//! - [`watch`] - Build, then rebuild on file changes

pub mod build;
pub(crate) mod utils;
pub mod watch;

pub use build::execute as build_execute;
pub use watch::execute as watch_execute;
