//! Human-readable run summary.

use console::style;

use crate::sync::{SyncMode, SyncOutcome};

/// Format a count with thousands separators: `1234567` -> `1,234,567`.
pub fn format_count<T: Into<i128>>(n: T) -> String {
    let n: i128 = n.into();
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

pub fn print_report(outcome: &SyncOutcome) {
    let mode = match outcome.mode {
        SyncMode::Full => "FULL",
        SyncMode::Incremental => "INCREMENTAL",
    };

    println!("\n{}", style("Status Sync").bold());
    println!("{}", "-".repeat(40));
    println!("{:<24} {}", "Mode:", mode);
    if outcome.dry_run {
        println!(
            "{} Dry run: no changes were written",
            style("!").yellow()
        );
    }

    if let Some(e) = &outcome.fatal {
        eprintln!("{} {}", style("✗").red(), e);
        return;
    }

    let stats = &outcome.stats;
    println!("{:<24} {}", "Pages:", format_count(stats.pages));
    println!("{:<24} {}", "Fetched:", format_count(stats.total_fetched));
    if outcome.dry_run {
        println!("{:<24} {}", "Would insert:", format_count(stats.would_insert));
    } else {
        println!("{:<24} {}", "New records:", format_count(stats.new_records));
    }
    println!("{:<24} {}", "Duplicates skipped:", format_count(stats.duplicates));
    println!("{:<24} {}", "Errors:", format_count(stats.errors));
    if stats.malformed > 0 {
        println!(
            "{:<24} {}",
            "Malformed skipped:",
            style(format_count(stats.malformed)).yellow()
        );
    }
    if stats.lookup_failures > 0 {
        println!(
            "{} {} dedupe lookups failed; those batches were inserted without a duplicate check",
            style("!").yellow(),
            format_count(stats.lookup_failures)
        );
    }

    if let Some(summary) = &outcome.summary {
        println!("\n{}", style("Database").bold());
        println!("{}", "-".repeat(40));
        println!("{:<24} {}", "Total records:", format_count(summary.total_records));
        println!("{:<24} {}", "Distinct sites:", format_count(summary.distinct_sites));
        if let Some(metadata) = &summary.metadata {
            if let Some(date) = metadata.last_sync_date {
                println!("{:<24} {}", "Last sync:", date.format("%Y-%m-%d %H:%M:%S"));
                println!(
                    "{:<24} {}",
                    "Total synced:",
                    format_count(metadata.total_records_synced)
                );
            }
        }
    }

    println!();
    if outcome.success() {
        println!("{} Sync complete", style("✓").green());
    } else {
        eprintln!(
            "{} Sync finished with {} insert errors",
            style("✗").red(),
            format_count(stats.errors)
        );
    }
}
