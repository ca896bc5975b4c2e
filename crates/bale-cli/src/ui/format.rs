//! Formatting utilities for sizes, durations, and build summaries.

use bale_bundler::BuildOutput;
use bale_graph::Diagnostic;
use console::Term;
use owo_colors::{OwoColorize, Stream::Stderr};
use std::time::Duration;

/// Format file size in human-readable format.
///
/// ```
/// use bale_cli::ui::format_size;
///
/// assert_eq!(format_size(0), "0 B");
/// assert_eq!(format_size(500), "500 B");
/// assert_eq!(format_size(1024), "1.00 KB");
/// assert_eq!(format_size(1_048_576), "1.00 MB");
/// ```
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

/// Format duration in human-readable format.
///
/// ```
/// use std::time::Duration;
/// use bale_cli::ui::format_duration;
///
/// assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
/// assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();

    if total_ms < 1000 {
        format!("{}ms", total_ms)
    } else if total_ms < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

/// Print one line per emitted bundle plus totals to stderr.
pub fn print_build_summary(output: &BuildOutput, elapsed: Duration) {
    let width = if super::is_ci() {
        80
    } else {
        (Term::stderr().size().1 as usize).min(80)
    };
    let rule = "─".repeat(width);

    eprintln!(
        "\n{}",
        "Bundles".if_supports_color(Stderr, |t| t.bold().underline().to_string())
    );
    eprintln!("{rule}");

    let mut total_size = 0u64;
    for bundle in &output.bundles {
        let size = output
            .file(&bundle.file)
            .map_or(0, |f| f.contents.len() as u64);
        total_size += size;
        eprintln!(
            "  {} {} {} {}",
            "▸".if_supports_color(Stderr, |t| t.blue().to_string()),
            bundle.file.if_supports_color(Stderr, |t| t.bold().to_string()),
            format_size(size).if_supports_color(Stderr, |t| t.dimmed().to_string()),
            format!("({} modules)", bundle.members.len())
                .if_supports_color(Stderr, |t| t.dimmed().to_string()),
        );
    }

    eprintln!("{rule}");
    let stats = output.stats;
    eprintln!(
        "  {} {} in {} ({} modules, {} transpiled, {} cached)",
        "Total:".if_supports_color(Stderr, |t| t.bold().to_string()),
        format_size(total_size).if_supports_color(Stderr, |t| t.green().to_string()),
        format_duration(elapsed).if_supports_color(Stderr, |t| t.green().to_string()),
        stats.modules,
        stats.transpiled,
        stats.cache_hits,
    );
}

/// Print recoverable diagnostics as warnings.
pub fn print_diagnostics(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        super::warning(&diagnostic.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size_bytes() {
        assert_eq!(format_size(1), "1 B");
        assert_eq!(format_size(1023), "1023 B");
    }

    #[test]
    fn test_format_size_larger_units() {
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(1_572_864), "1.50 MB");
        assert_eq!(format_size(2_147_483_648), "2.00 GB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(0)), "0ms");
        assert_eq!(format_duration(Duration::from_millis(999)), "999ms");
        assert_eq!(format_duration(Duration::from_millis(59_999)), "60.00s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
    }
}
