use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Available bale subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build bundles once
    ///
    /// Writes content-hashed bundles, their source maps and loaderConfig.json
    /// to the output directory.
    Build(BuildArgs),

    /// Build, then rebuild on every file change
    ///
    /// Only modules read from a changed file (and their importers) are
    /// transpiled again. A package.json change reloads the installed tree.
    Watch(WatchArgs),
}

/// Arguments for the build command
///
/// Every option is also accepted from `bale.config.json` and `BALE_*`
/// environment variables; flags given here win.
#[derive(Args, Debug, Clone, Default)]
pub struct BuildArgs {
    /// Entry modules, relative to the project root or bare package specifiers
    ///
    /// Examples:
    ///   bale build home.js
    ///   bale build pages/home.js pages/admin.js
    #[arg(value_name = "ENTRY")]
    pub entries: Vec<String>,

    /// Modules loaded before any entry; shared dependencies land here
    #[arg(short, long, value_name = "MODULE", value_delimiter = ',')]
    pub preload: Vec<String>,

    /// Modules kept out of eager bundles and fetched on demand
    #[arg(short, long, value_name = "MODULE", value_delimiter = ',')]
    pub lazyload: Vec<String>,

    /// Packages shipped as standalone bundles
    ///
    /// Examples:
    ///   --isolate react --isolate react-dom
    ///   --isolate react,react-dom
    #[arg(short, long, value_name = "PACKAGE", value_delimiter = ',')]
    pub isolate: Vec<String>,

    /// Output directory, relative to the project root
    #[arg(short = 'd', long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Transpile cache directory, relative to the project root
    #[arg(long, value_name = "DIR", conflicts_with = "no_cache")]
    pub cache_dir: Option<PathBuf>,

    /// Disable the persistent transpile cache
    #[arg(long)]
    pub no_cache: bool,

    /// Project root containing package.json (defaults to the current directory)
    #[arg(short, long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Path to a config file (defaults to <root>/bale.config.json)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// URL prefix the loader fetches bundles from
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Skip writing .map files
    #[arg(long)]
    pub no_sourcemap: bool,
}

/// Arguments for the watch command
#[derive(Args, Debug, Clone)]
pub struct WatchArgs {
    #[command(flatten)]
    pub build: BuildArgs,

    /// Quiet period before a burst of changes triggers a rebuild
    #[arg(long, value_name = "MS", default_value_t = 100)]
    pub debounce: u64,
}
