//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use chrono::Local;
use serde::Serialize;

use namesync_core::NameRecord;

/// How creation times are shown to people
pub const DATE_FORMAT: &str = "%d.%m.%Y %H:%M";

/// Longest name shown in list output before truncation
const MAX_NAME_WIDTH: usize = 48;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print a list of names in the given order
    pub fn print_names(&self, records: &[&NameRecord]) {
        match self.format {
            OutputFormat::Human => {
                if records.is_empty() {
                    println!("No names yet.");
                    return;
                }
                for record in records {
                    println!("{}", format_row(record));
                }
                println!("\n{} name(s)", records.len());
            }
            OutputFormat::Json => print_json(&records),
            OutputFormat::Quiet => {
                for record in records {
                    println!("{}", record.id);
                }
            }
        }
    }

    /// Print the server greeting
    pub fn greeting(&self, text: &str) {
        match self.format {
            OutputFormat::Human | OutputFormat::Quiet => println!("{}", text),
            OutputFormat::Json => print_json(&serde_json::json!({ "text": text })),
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// Creation time in local time, e.g. `05.03.2024 14:07`
pub fn format_created(record: &NameRecord) -> String {
    record
        .created_at
        .with_timezone(&Local)
        .format(DATE_FORMAT)
        .to_string()
}

/// One human-readable list row
fn format_row(record: &NameRecord) -> String {
    format!(
        "{:>6} | {} | {}",
        record.id,
        format_created(record),
        truncate(&record.name, MAX_NAME_WIDTH)
    )
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to encode output: {}", e),
    }
}

/// Truncate a string to `max_chars` characters, adding "..." if truncated
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
    }

    #[test]
    fn test_truncate_counts_characters() {
        // Ten Cyrillic characters, twenty bytes
        assert_eq!(truncate("Александра", 10), "Александра");
        assert_eq!(truncate("Александра", 8), "Алекс...");
    }

    #[test]
    fn test_format_row() {
        let created = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 0).unwrap();
        let record = NameRecord::new(12, "Anna", created);

        let row = format_row(&record);
        assert!(row.starts_with("    12 | "));
        assert!(row.ends_with(" | Anna"));
        assert_eq!(
            format_created(&record),
            created.with_timezone(&Local).format(DATE_FORMAT).to_string()
        );
    }
}
