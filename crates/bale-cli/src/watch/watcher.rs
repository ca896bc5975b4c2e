//! Filesystem watcher feeding `bale watch`.
//!
//! Watches the project root recursively and forwards changed paths through a
//! channel, dropping the build's own output and cache directories so writing
//! bundles never triggers another build.

use crate::error::{CliError, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// File change event type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    Modified(PathBuf),
    Created(PathBuf),
    Removed(PathBuf),
}

impl FileChange {
    /// Get the path affected by this change.
    pub fn path(&self) -> &Path {
        match self {
            FileChange::Modified(p) | FileChange::Created(p) | FileChange::Removed(p) => p,
        }
    }
}

/// Recursive watcher with per-path debouncing.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl FileWatcher {
    /// Start watching `root`.
    ///
    /// `ignored` holds directories (absolute, or relative to `root`) whose
    /// contents never produce events. Repeated events for one path inside
    /// `debounce` are collapsed.
    pub fn new(
        root: PathBuf,
        ignored: Vec<PathBuf>,
        debounce: Duration,
    ) -> Result<(Self, mpsc::Receiver<FileChange>)> {
        if !root.is_dir() {
            return Err(CliError::FileNotFound(root));
        }

        let (tx, rx) = mpsc::channel(256);
        let ignored: Vec<PathBuf> = ignored
            .into_iter()
            .map(|dir| if dir.is_absolute() { dir } else { root.join(dir) })
            .collect();
        let watch_root = root.clone();
        let mut last_event: Option<(PathBuf, Instant)> = None;

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(err) => {
                    tracing::warn!(error = %err, "watch error");
                    return;
                }
            };

            for path in &event.paths {
                if Self::should_ignore(path, &watch_root, &ignored) {
                    continue;
                }

                let now = Instant::now();
                if let Some((last_path, last_time)) = &last_event {
                    if last_path == path && now.duration_since(*last_time) < debounce {
                        continue;
                    }
                }
                last_event = Some((path.clone(), now));

                let change = match event.kind {
                    EventKind::Create(_) => FileChange::Created(path.clone()),
                    EventKind::Modify(_) => FileChange::Modified(path.clone()),
                    EventKind::Remove(_) => FileChange::Removed(path.clone()),
                    _ => continue,
                };

                // The receiver is gone once watch mode shuts down.
                if tx.blocking_send(change).is_err() {
                    return;
                }
            }
        })?;

        watcher.watch(&root, RecursiveMode::Recursive)?;

        Ok((
            Self {
                _watcher: watcher,
                root,
            },
            rx,
        ))
    }

    /// Paths outside `root`, inside an ignored directory, or under a hidden
    /// directory are dropped. `node_modules` is watched: an installed
    /// package's files are sources too.
    fn should_ignore(path: &Path, root: &Path, ignored: &[PathBuf]) -> bool {
        let Ok(rel_path) = path.strip_prefix(root) else {
            return true;
        };

        if ignored.iter().any(|dir| path.starts_with(dir)) {
            return true;
        }

        rel_path.components().any(|component| {
            component
                .as_os_str()
                .to_str()
                .is_some_and(|name| name.starts_with('.') && name != "." && name != "..")
        })
    }

    /// Get the root directory being watched.
    pub fn root(&self) -> &Path {
        &self.root
    }
}
