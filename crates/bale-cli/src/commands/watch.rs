//! `bale watch`.
//!
//! One session lives for the whole run, so the module graph and the transpile
//! cache stay warm: a change only re-reads the modules loaded from the changed
//! file and re-transpiles what actually differs.

use crate::cli::WatchArgs;
use crate::commands::build::{build_once, open_session};
use crate::config;
use crate::error::Result;
use crate::ui;
use crate::watch::{FileChange, FileWatcher};
use bale_bundler::BuildSession;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

/// Execute the watch command. Runs until Ctrl-C.
pub async fn execute(args: WatchArgs) -> Result<()> {
    let mut config = config::load(&args.build)?;
    config.root = config.root.canonicalize()?;
    let session = open_session(config)?;

    // A failing first build is reported, not fatal: the fix is usually one save away.
    if let Err(err) = build_once(&session).await {
        report(err);
    }

    let debounce = Duration::from_millis(args.debounce);
    let mut ignored = vec![session.config().out_dir_path()];
    ignored.extend(session.config().cache_dir_path());
    let (_watcher, mut changes) =
        FileWatcher::new(session.config().root.clone(), ignored, debounce)?;

    ui::info(&format!(
        "Watching {} for changes (Ctrl-C to stop)",
        session.config().root.display()
    ));

    loop {
        tokio::select! {
            change = changes.recv() => {
                let Some(change) = change else { break };
                let batch = collect_batch(change, &mut changes, debounce).await;
                if let Err(err) = rebuild(&session, batch).await {
                    report(err);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                ui::info("Stopping watch");
                break;
            }
        }
    }

    Ok(())
}

/// Gather every change that arrives within `quiet` of the previous one.
async fn collect_batch(
    first: FileChange,
    changes: &mut mpsc::Receiver<FileChange>,
    quiet: Duration,
) -> BTreeSet<PathBuf> {
    let mut batch = BTreeSet::from([first.path().to_path_buf()]);
    while let Ok(Some(change)) = tokio::time::timeout(quiet, changes.recv()).await {
        batch.insert(change.path().to_path_buf());
    }
    batch
}

async fn rebuild(session: &BuildSession, paths: BTreeSet<PathBuf>) -> Result<()> {
    let mut dirty = false;
    for path in &paths {
        let changes = session.reload(path).await?;
        if changes.has_changes() {
            tracing::debug!(
                path = %path.display(),
                modified = changes.modified.len(),
                affected = changes.affected_count(),
                full = changes.full_rebuild,
                "change detected"
            );
            dirty = true;
        }
    }

    if !dirty {
        return Ok(());
    }

    ui::info(&format!("{} file(s) changed, rebuilding", paths.len()));
    build_once(session).await?;
    Ok(())
}

fn report(err: crate::error::CliError) {
    eprintln!("{:?}", crate::error::cli_error_to_miette(err));
}
