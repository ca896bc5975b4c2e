//! Emitting bundles and the loader manifest.

pub mod emit;
pub mod loader_config;
pub mod writer;

pub use emit::{EmittedBundle, render_bundle, render_plan};
pub use loader_config::{LOADER_CONFIG_FILE, build_loader_config, write_loader_config};
pub use writer::{OutputFile, write_files};
