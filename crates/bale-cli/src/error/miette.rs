//! Miette diagnostic conversion for CLI errors.

use crate::error::{BuildError, CliError};
use miette::Report;

/// Convert CliError to miette Report
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Build(e) => build_error_to_miette(e),
        CliError::Bundler(e) => bundler_error_to_miette(e),
        CliError::Config(e) => miette::miette!("Configuration error: {}", e),
        _ => miette::miette!("{}", err),
    }
}

/// Convert BuildError to miette Report
pub fn build_error_to_miette(err: BuildError) -> Report {
    match err {
        BuildError::OutputNotWritable(path) => miette::miette!(
            code = "OUTPUT_NOT_WRITABLE",
            help = "Choose an --out-dir inside the project",
            "Output directory is not writable: {}",
            path.display()
        ),
        _ => miette::miette!("{}", err),
    }
}

/// Convert a bale-bundler Error to a miette Report.
///
/// The bundler's own `Diagnostic` impl supplies the code and help text,
/// including the import chain of a transpile failure.
pub fn bundler_error_to_miette(err: bale_bundler::Error) -> Report {
    Report::new(err)
}
