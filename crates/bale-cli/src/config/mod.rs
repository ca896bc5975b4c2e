//! Layered configuration for bale builds.
//!
//! Merges settings from CLI args, environment variables, and `bale.config.json`
//! into a [`BuildConfig`]. Priority: CLI > Environment > File > Defaults.

mod loading;

pub use bale_bundler::BuildConfig;
pub use loading::{CONFIG_FILE, ENV_PREFIX, env_key, load};
