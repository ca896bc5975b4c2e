//! Command-line interface definition for the bale bundler.
//!
//! # Command Structure
//!
//! - `bale build` - Resolve, transpile and write bundles plus `loaderConfig.json`
//! - `bale watch` - Build once, then rebuild whenever a source file changes

mod commands;

use clap::Parser;

pub use commands::{BuildArgs, Command, WatchArgs};

/// bale - component bundler with version-aware module loading
#[derive(Parser, Debug)]
#[command(
    name = "bale",
    version,
    about = "Bundle components and their installed dependencies for the bale loader",
    long_about = "bale resolves entry modules through the installed node_modules tree,\n\
                  keeps every package version in its own scope, and splits the result\n\
                  into mutually exclusive bundles described by loaderConfig.json."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    ///
    /// Shows every resolution, transpile and cache decision.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}
