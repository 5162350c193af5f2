use chrono::{DateTime, FixedOffset, Utc};
use colored::Colorize;

use crate::rewards::reporter::CycleResult;

/// Format a timestamp in the reference zone
pub fn format_timestamp(timestamp: &DateTime<Utc>, offset: FixedOffset) -> String {
    timestamp
        .with_timezone(&offset)
        .format("%Y-%m-%d %H:%M:%S %:z")
        .to_string()
}

/// Shorten long free text for table cells
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Colored label for a cycle result
pub fn format_result(result: CycleResult) -> String {
    match result {
        CycleResult::Ok => "ok".green().to_string(),
        CycleResult::None => "none".yellow().to_string(),
        CycleResult::Error => "error".red().to_string(),
    }
}

pub fn format_flag(on: bool) -> String {
    if on {
        "on".green().to_string()
    } else {
        "off".dimmed().to_string()
    }
}

/// Prompt user for yes/no confirmation
pub fn confirm_action(prompt: &str) -> bool {
    use std::io::{self, Write};

    print!("{} (y/N): ", prompt);
    if io::stdout().flush().is_err() {
        return false;
    }

    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_err() {
        return false;
    }

    matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Print a formatted table border
pub fn print_table_border(width: usize) {
    println!("{}", "=".repeat(width));
}

/// Print a table row with columns
pub fn print_table_row(columns: &[&str], widths: &[usize]) {
    let mut row = String::new();
    for (i, col) in columns.iter().enumerate() {
        if i < widths.len() {
            row.push_str(&format!("{:<width$}  ", col, width = widths[i]));
        }
    }
    println!("{}", row.trim_end());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Claimed 3 mails → gold 100", 12), "Claimed 3...");
        assert_eq!(truncate("→→→→→", 4), "→...");
    }

    #[test]
    fn test_format_timestamp_uses_offset() {
        let at = DateTime::parse_from_rfc3339("2026-03-01T20:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let offset = FixedOffset::east_opt(8 * 3600).unwrap();
        assert_eq!(format_timestamp(&at, offset), "2026-03-02 04:00:00 +08:00");
    }
}
