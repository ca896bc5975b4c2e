//! Secure file writing for bundle output.
//!
//! Every emitted file name is validated against the output directory before
//! anything is written, and a build's files are written as one unit:
//!
//! 1. write each file to a sibling `<name>.tmp`
//! 2. once all writes succeed, rename each temp file over its target
//! 3. on any failure, remove the temp files written so far
//!
//! `rename()` is atomic on most filesystems, so a reader never sees a
//! half-written bundle.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use path_clean::PathClean;
use tracing::{debug, warn};

use crate::{Error, Result};

/// A file ready to be written, relative to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub name: String,
    pub contents: Vec<u8>,
}

impl OutputFile {
    pub fn new(name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }
}

/// Write `files` under `dir` with traversal checks and atomic replacement.
///
/// With `overwrite` off, an existing target is an error and nothing is
/// written.
pub fn write_files(dir: &Path, files: &[OutputFile], overwrite: bool) -> Result<()> {
    let dir = validate_and_normalize_dir(dir)?;

    fs::create_dir_all(&dir).map_err(|e| {
        Error::WriteFailure(format!(
            "Failed to create output directory '{}': {}",
            dir.display(),
            e
        ))
    })?;

    let mut operations = Vec::with_capacity(files.len());
    for file in files {
        let target_path = validate_output_path(&dir, &file.name)?;

        if !overwrite && target_path.exists() {
            return Err(Error::OutputExists(format!(
                "File already exists: '{}'. Use overwrite=true to replace.",
                target_path.display()
            )));
        }

        operations.push((target_path, file.contents.as_slice()));
    }

    write_files_atomic(&operations)?;
    debug!(dir = %dir.display(), files = files.len(), "wrote output files");

    Ok(())
}

/// Normalize `dir` (resolving `.` and `..`) and make it absolute.
fn validate_and_normalize_dir(dir: &Path) -> Result<PathBuf> {
    let cleaned = dir.clean();

    let absolute = if cleaned.is_absolute() {
        cleaned
    } else {
        std::env::current_dir()
            .map_err(|e| {
                Error::InvalidOutputPath(format!("Failed to get current directory: {}", e))
            })?
            .join(&cleaned)
            .clean()
    };

    Ok(absolute)
}

/// Join `filename` onto `base_dir`, rejecting anything that resolves outside
/// of it.
pub(crate) fn validate_output_path(base_dir: &Path, filename: &str) -> Result<PathBuf> {
    if filename.contains('\0') {
        return Err(Error::InvalidOutputPath(
            "Filename contains null byte".to_string(),
        ));
    }

    #[cfg(target_os = "windows")]
    {
        let upper = filename.to_uppercase();
        let device_names = [
            "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7",
            "COM8", "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
        ];
        for device in &device_names {
            if upper == *device || upper.starts_with(&format!("{}.", device)) {
                return Err(Error::InvalidOutputPath(format!(
                    "Filename is a reserved device name: {}",
                    filename
                )));
            }
        }
    }

    let filename_path = Path::new(filename).clean();
    let full_path = base_dir.join(&filename_path).clean();

    if !full_path.starts_with(base_dir) || full_path == base_dir {
        return Err(Error::InvalidOutputPath(format!(
            "Path '{}' escapes output directory '{}' (resolved to '{}')",
            filename,
            base_dir.display(),
            full_path.display()
        )));
    }

    Ok(full_path)
}

fn temp_path_for(target: &Path) -> PathBuf {
    let mut name = OsString::from(target.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

fn write_files_atomic(operations: &[(PathBuf, &[u8])]) -> Result<()> {
    let mut temp_files = Vec::new();

    for (target_path, content) in operations {
        if let Some(parent) = target_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                cleanup_temp_files(&temp_files);
                Error::WriteFailure(format!(
                    "Failed to create directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let temp_path = temp_path_for(target_path);
        fs::write(&temp_path, content).map_err(|e| {
            cleanup_temp_files(&temp_files);
            Error::WriteFailure(format!(
                "Failed to write temporary file '{}': {}",
                temp_path.display(),
                e
            ))
        })?;

        temp_files.push((temp_path, target_path.clone()));
    }

    for (temp_path, target_path) in &temp_files {
        fs::rename(temp_path, target_path).map_err(|e| {
            cleanup_temp_files(&temp_files);
            Error::WriteFailure(format!(
                "Failed to rename '{}' to '{}': {}",
                temp_path.display(),
                target_path.display(),
                e
            ))
        })?;
    }

    Ok(())
}

/// Best-effort removal of temp files; we're already failing.
fn cleanup_temp_files(temp_files: &[(PathBuf, PathBuf)]) {
    for (temp_path, _) in temp_files {
        if temp_path.exists() {
            if let Err(e) = fs::remove_file(temp_path) {
                warn!(
                    path = %temp_path.display(),
                    error = %e,
                    "failed to clean up temporary file"
                );
            }
        }
    }
}
