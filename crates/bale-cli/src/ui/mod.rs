//! Terminal output for build results and status messages.
//!
//! Everything goes to stderr so stdout stays free for piping.

mod format;
mod messages;

pub use format::{format_duration, format_size, print_build_summary, print_diagnostics};
pub use messages::{error, info, success, warning};

/// Check if running in a CI environment.
pub fn is_ci() -> bool {
    std::env::var("CI").is_ok()
        || std::env::var("GITHUB_ACTIONS").is_ok()
        || std::env::var("GITLAB_CI").is_ok()
        || std::env::var("CIRCLECI").is_ok()
        || std::env::var("TRAVIS").is_ok()
}

/// Apply color preferences to `owo-colors` output.
///
/// `--no-color`, `NO_COLOR` and non-terminal stderr all turn colors off.
pub fn init_colors(no_color: bool) {
    let enabled = !no_color && crate::logger::should_use_colors();
    owo_colors::set_override(enabled);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_is_ci_with_ci_var() {
        unsafe { std::env::set_var("CI", "true") };
        assert!(is_ci());
        unsafe { std::env::remove_var("CI") };
    }

    #[test]
    #[serial]
    fn test_is_ci_with_github_actions() {
        unsafe { std::env::set_var("GITHUB_ACTIONS", "true") };
        assert!(is_ci());
        unsafe { std::env::remove_var("GITHUB_ACTIONS") };
    }

    #[test]
    fn test_init_colors() {
        init_colors(true);
    }
}
