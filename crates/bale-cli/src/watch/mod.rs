//! File watching for `bale watch`.

mod watcher;

pub use watcher::{FileChange, FileWatcher};
