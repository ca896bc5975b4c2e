//! Logging setup for the bale CLI.
//!
//! Library crates only emit `tracing` events; the binary decides where they
//! go. Verbosity comes from `--verbose`/`--quiet`, then `RUST_LOG`, then an
//! INFO default for the bale crates.
//!
//! ```rust,no_run
//! use bale_cli::logger::init_logger;
//! use tracing::info;
//!
//! init_logger(false, false, false);
//! info!("Starting build");
//! ```

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const VERBOSE_FILTER: &str = "bale_graph=debug,bale_bundler=debug,bale_cli=debug";
const QUIET_FILTER: &str = "bale_graph=error,bale_bundler=error,bale_cli=error";
const DEFAULT_FILTER: &str = "bale_graph=warn,bale_bundler=info,bale_cli=info";

/// Initialize the tracing subscriber.
///
/// Call once, before any logging occurs. `verbose` wins over `quiet`; colors
/// are disabled by `no_color` or by [`should_use_colors`].
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let filter = filter_for(verbose, quiet);
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color && should_use_colors())
        .with_writer(std::io::stderr)
        .without_time()
        .compact();

    // A second initialization (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

fn filter_for(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else if quiet {
        EnvFilter::new(QUIET_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Check if colored output should be enabled.
///
/// - `NO_COLOR`: If set, disables colors
/// - `FORCE_COLOR`: If set, forces colors even in non-TTY
pub fn should_use_colors() -> bool {
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    console::Term::stderr().features().colors_supported()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_should_use_colors_respects_force_color() {
        unsafe {
            std::env::remove_var("NO_COLOR");
            std::env::set_var("FORCE_COLOR", "1");
        }
        assert!(should_use_colors());
        unsafe {
            std::env::remove_var("FORCE_COLOR");
        }
    }

    #[test]
    #[serial]
    fn test_no_color_wins_over_force_color() {
        unsafe {
            std::env::set_var("NO_COLOR", "1");
            std::env::set_var("FORCE_COLOR", "1");
        }
        assert!(!should_use_colors());
        unsafe {
            std::env::remove_var("NO_COLOR");
            std::env::remove_var("FORCE_COLOR");
        }
    }

    #[test]
    fn test_filters_parse() {
        let _ = filter_for(true, false);
        let _ = filter_for(false, true);
        let _ = EnvFilter::new(DEFAULT_FILTER);
    }
}
