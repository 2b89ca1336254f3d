//! Terminal output helpers for the command line.
//!
//! Colored status lines and the end-of-batch report. Everything here writes
//! to stdout; logs go to stderr through `tracing`.

use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::path::Path;

use crate::models::{BatchResult, FailedDoi};

/// Check if stdout is a terminal.
pub fn is_terminal() -> bool {
    std::io::stdout().is_terminal()
}

/// Status types for colored output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
    Warning,
    Info,
    Download,
}

/// Status icons for different operations.
pub fn status_icon(status: Status) -> &'static str {
    match status {
        Status::Success => "✓",
        Status::Error => "✗",
        Status::Warning => "⚠",
        Status::Info => "ℹ",
        Status::Download => "↓",
    }
}

/// Print a styled status message.
pub fn print_status(status: Status, msg: &str) {
    let icon = status_icon(status);
    match status {
        Status::Success => println!("{} {}", icon.green().bold(), msg),
        Status::Error => println!("{} {}", icon.red().bold(), msg),
        Status::Warning => println!("{} {}", icon.yellow().bold(), msg),
        Status::Info => println!("{} {}", icon.cyan().bold(), msg),
        Status::Download => println!("{} {}", icon.magenta(), msg),
    }
}

/// Print a section header.
pub fn print_section(title: &str) {
    println!();
    println!("{}", format!("━━━ {} ━━━", title).bold().cyan());
}

/// Print a divider line.
pub fn print_divider() {
    println!("{}", "─".repeat(60).dimmed());
}

/// Get a human-readable file size.
pub fn format_file_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Short reason for a failed DOI, taken from its last attempt
pub fn failure_reason(failure: &FailedDoi) -> String {
    if let Some(error) = &failure.error {
        return error.clone();
    }
    failure
        .attempts
        .last()
        .map(|a| format!("{}: {}", a.source, a.message))
        .unwrap_or_else(|| "no source attempted".to_string())
}

/// Print the end-of-batch report
pub fn print_summary(result: &BatchResult, archive: Option<&Path>, manifest: Option<&Path>) {
    print_section("Download Summary");
    println!("  Total DOIs Processed: {}", result.total().to_string().bold());
    println!(
        "  Successful Downloads: {}",
        result.success_count().to_string().green().bold()
    );
    println!(
        "  Failed Downloads:     {}",
        result.failed_count().to_string().red().bold()
    );
    println!(
        "  Downloaded Size:      {}",
        format_file_size(result.total_bytes())
    );

    if !result.records.is_empty() {
        println!();
        for record in &result.records {
            print_status(
                Status::Success,
                &format!(
                    "{} ({}, {})",
                    record.doi,
                    record.source,
                    format_file_size(record.bytes)
                ),
            );
        }
    }

    if !result.failures.is_empty() {
        println!();
        for failure in &result.failures {
            print_status(
                Status::Error,
                &format!("{} {}", failure.doi, failure_reason(failure).dimmed()),
            );
        }
    }

    println!();
    print_divider();
    match archive {
        Some(path) => print_status(
            Status::Download,
            &format!("Papers archived to {}", path.display()),
        ),
        None => print_status(Status::Info, "No successful downloads available."),
    }
    match manifest {
        Some(path) => print_status(
            Status::Warning,
            &format!("Failed DOIs listed in {}", path.display()),
        ),
        None => print_status(Status::Info, "No failed downloads."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttemptFailure, Doi, DownloadSource, FailureKind};

    #[test]
    fn test_status_icon() {
        assert_eq!(status_icon(Status::Success), "✓");
        assert_eq!(status_icon(Status::Error), "✗");
        assert_eq!(status_icon(Status::Download), "↓");
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(500), "500 B");
        assert_eq!(format_file_size(1024), "1.00 KB");
        assert_eq!(format_file_size(1048576), "1.00 MB");
    }

    #[test]
    fn test_failure_reason() {
        let failure = FailedDoi {
            doi: Doi::normalize("10.1/x"),
            attempts: vec![AttemptFailure {
                source: DownloadSource::OpenAccess,
                kind: FailureKind::OpenAccessUnavailable,
                message: "nothing".to_string(),
            }],
            error: None,
        };
        assert_eq!(failure_reason(&failure), "open access: nothing");

        let aborted = FailedDoi {
            doi: Doi::normalize("10.1/y"),
            attempts: vec![],
            error: Some("panicked".to_string()),
        };
        assert_eq!(failure_reason(&aborted), "panicked");
    }
}
