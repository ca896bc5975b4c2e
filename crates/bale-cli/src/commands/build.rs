//! `bale build`.

use crate::cli::BuildArgs;
use crate::commands::utils;
use crate::config::{self, BuildConfig};
use crate::error::{BuildError, Result};
use crate::ui;
use bale_bundler::{BuildOutput, BuildSession};
use bale_graph::{NativeRuntime, TranspilerRegistry};
use std::sync::Arc;
use std::time::Instant;

/// Execute the build command.
///
/// 1. Load and validate configuration (CLI > Env > File > Defaults)
/// 2. Check the project root and output directory
/// 3. Build and write bundles plus loaderConfig.json
/// 4. Print diagnostics and the bundle summary
pub async fn execute(args: BuildArgs) -> Result<()> {
    let config = config::load(&args)?;
    let session = open_session(config)?;
    build_once(&session).await?;
    Ok(())
}

/// Validate the project layout and open a session over the native filesystem.
pub(crate) fn open_session(config: BuildConfig) -> Result<BuildSession> {
    if !config.root.join("package.json").is_file() {
        return Err(BuildError::MissingManifest(config.root.clone()).into());
    }

    let out_dir = config.out_dir_path();
    utils::validate_output_dir(&out_dir, &config.root)?;
    utils::ensure_output_dir(&out_dir)?;

    tracing::debug!(
        root = %config.root.display(),
        entries = ?config.entries,
        preload = ?config.preload,
        lazyload = ?config.lazyload,
        isolate = ?config.isolate,
        "opening build session"
    );

    Ok(BuildSession::new(
        config,
        Arc::new(NativeRuntime::new()),
        TranspilerRegistry::with_builtins(),
    )?)
}

/// Run one build and report it.
pub(crate) async fn build_once(session: &BuildSession) -> Result<BuildOutput> {
    let start_time = Instant::now();
    let output = session.build().await?;
    let elapsed = start_time.elapsed();

    ui::print_diagnostics(&output.diagnostics);
    ui::print_build_summary(&output, elapsed);
    ui::success(&format!(
        "Built {} bundles to {} in {}",
        output.bundles.len(),
        session.config().out_dir.display(),
        ui::format_duration(elapsed)
    ));

    Ok(output)
}
