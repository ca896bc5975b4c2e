use crate::cli::BuildArgs;
use crate::commands::utils;
use crate::error::{CliError, ConfigError, Result};
use bale_bundler::BuildConfig;
use figment::{
    Figment,
    providers::{Env, Format as _, Json, Serialized},
};
use serde_json::{Map, Value, json};
use std::path::PathBuf;

/// Config file looked up in the project root when `--config` is absent.
pub const CONFIG_FILE: &str = "bale.config.json";

/// Prefix of environment overrides, e.g. `BALE_OUT_DIR=public`.
pub const ENV_PREFIX: &str = "BALE_";

/// Load and validate the build configuration.
///
/// The project root is `--root`, else the nearest ancestor of the current
/// directory holding a package.json, else the current directory.
pub fn load(args: &BuildArgs) -> Result<BuildConfig> {
    let cwd = std::env::current_dir()?;
    let root = match &args.root {
        Some(root) => utils::resolve_path(root, &cwd),
        None => utils::find_package_json(&cwd).unwrap_or_else(|| cwd.clone()),
    };

    let mut figment = Figment::new().merge(Serialized::defaults(BuildConfig::new(root.clone())));

    let config_file = match &args.config {
        Some(path) => {
            let path = utils::resolve_path(path, &cwd);
            if !path.is_file() {
                return Err(ConfigError::NotFound(path).into());
            }
            Some(path)
        }
        None => Some(root.join(CONFIG_FILE)).filter(|p| p.is_file()),
    };
    if let Some(path) = config_file {
        tracing::debug!(path = %path.display(), "loading config file");
        figment = figment.merge(Json::file(path));
    }

    // BALE_OUT_DIR, BALE_BASE_URL, BALE_ENTRIES="[home.js, admin.js]", ...
    figment = figment.merge(
        Env::prefixed(ENV_PREFIX)
            .map(|key| env_key(key.as_str()).into())
            .lowercase(false),
    );

    figment = figment.merge(Serialized::defaults(cli_overrides(args, &cwd)));

    let mut config: BuildConfig = figment.extract().map_err(|e| ConfigError::InvalidValue {
        field: "configuration".to_string(),
        value: e.to_string(),
        hint: "Check bale.config.json syntax and field types".to_string(),
    })?;

    if args.no_cache {
        config.cache_dir = None;
    }
    config.root = utils::resolve_path(&config.root, &cwd);

    config.validate().map_err(|err| match err {
        bale_bundler::Error::InvalidConfig(msg) => ConfigError::Invalid(msg).into(),
        other => CliError::Bundler(other),
    })
}

/// Only flags the user actually passed, so unset flags never mask lower layers.
fn cli_overrides(args: &BuildArgs, cwd: &std::path::Path) -> Value {
    let mut map = Map::new();
    let lists = [
        ("entries", &args.entries),
        ("preload", &args.preload),
        ("lazyload", &args.lazyload),
        ("isolate", &args.isolate),
    ];
    for (key, list) in lists {
        if !list.is_empty() {
            map.insert(key.to_string(), json!(list));
        }
    }

    let paths: [(&str, Option<PathBuf>); 3] = [
        ("root", args.root.as_deref().map(|r| utils::resolve_path(r, cwd))),
        ("outDir", args.out_dir.clone()),
        ("cacheDir", args.cache_dir.clone()),
    ];
    for (key, path) in paths {
        if let Some(path) = path {
            map.insert(key.to_string(), json!(path));
        }
    }

    if let Some(base_url) = &args.base_url {
        map.insert("baseUrl".to_string(), json!(base_url));
    }
    if args.no_sourcemap {
        map.insert("sourcemap".to_string(), json!(false));
    }
    Value::Object(map)
}

/// Map an environment key (prefix stripped) onto its camelCase config field.
///
/// ```
/// use bale_cli::config::env_key;
///
/// assert_eq!(env_key("OUT_DIR"), "outDir");
/// assert_eq!(env_key("TRANSPILER_OPTIONS"), "transpilerOptions");
/// assert_eq!(env_key("entries"), "entries");
/// ```
pub fn env_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper_next = false;
    for c in key.chars() {
        if c == '_' {
            upper_next = !out.is_empty();
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.extend(c.to_lowercase());
        }
    }
    out
}
