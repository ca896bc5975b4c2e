//! Shared utilities for command implementations.

use crate::error::{BuildError, CliError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Resolve a path relative to a working directory.
pub fn resolve_path(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

/// Ensure an output directory exists, creating it if necessary.
pub fn ensure_output_dir(out_dir: &Path) -> Result<()> {
    if !out_dir.exists() {
        fs::create_dir_all(out_dir)?;
    } else if !out_dir.is_dir() {
        return Err(CliError::InvalidArgument(format!(
            "Output path exists but is not a directory: {}",
            out_dir.display()
        )));
    }

    Ok(())
}

/// Reject output directories that would clobber the project or the system.
///
/// The output must live inside `root` (or be a sibling of it) and may not be
/// the root itself, since bundles are written with overwrite enabled.
pub fn validate_output_dir(out_dir: &Path, root: &Path) -> Result<()> {
    let canonical_out = canonicalize_lenient(out_dir)?;
    let canonical_root = root.canonicalize()?;

    let is_within_project =
        canonical_out.starts_with(&canonical_root) && canonical_out != canonical_root;
    let is_sibling = canonical_out
        .parent()
        .zip(canonical_root.parent())
        .is_some_and(|(a, b)| a == b);

    if !is_within_project && !is_sibling {
        return Err(BuildError::OutputNotWritable(out_dir.to_path_buf()).into());
    }

    Ok(())
}

/// Canonicalize the longest existing prefix of `path` and re-append the rest.
fn canonicalize_lenient(path: &Path) -> Result<PathBuf> {
    let not_writable = || CliError::Build(BuildError::OutputNotWritable(path.to_path_buf()));
    let mut existing = path;
    let mut missing = Vec::new();
    while !existing.exists() {
        missing.push(existing.file_name().ok_or_else(not_writable)?);
        existing = existing.parent().ok_or_else(not_writable)?;
    }

    let mut canonical = existing.canonicalize()?;
    canonical.extend(missing.into_iter().rev());
    Ok(canonical)
}

/// Walk up from `start_dir` to the nearest directory holding a package.json.
pub fn find_package_json(start_dir: &Path) -> Option<PathBuf> {
    start_dir
        .ancestors()
        .find(|dir| dir.join("package.json").is_file())
        .map(Path::to_path_buf)
}
