use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use reconcile::{ApplyResult, ExecuteSummary, Report, Verification};
use std::time::Duration;

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

// ============================================================================
// Progress
// ============================================================================

/// Spinner shown while pages are fetched; hidden when quiet
pub fn spinner(msg: &str, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Progress text for `(fetched, total)`
pub fn fetched(what: &str, fetched: usize, total: usize) -> String {
    format!("Fetching {what} {fetched}/{total}")
}

// ============================================================================
// Reports
// ============================================================================

fn symbol(result: &ApplyResult) -> String {
    match result {
        ApplyResult::NoChange => "=".dimmed().to_string(),
        ApplyResult::Created => "+".green().to_string(),
        ApplyResult::Modified => "~".yellow().to_string(),
        ApplyResult::Removed => "-".red().to_string(),
        ApplyResult::Failed { .. } => "✗".red().to_string(),
        ApplyResult::Skipped { .. } => "·".dimmed().to_string(),
    }
}

/// One-line count of what happened
pub fn summary_line(summary: &ExecuteSummary) -> String {
    let parts = [
        (summary.created, "created"),
        (summary.modified, "modified"),
        (summary.removed, "removed"),
        (summary.skipped, "skipped"),
        (summary.failed, "failed"),
        (summary.no_change, "unchanged"),
    ];
    let text: Vec<String> = parts
        .iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, label)| format!("{n} {label}"))
        .collect();
    if text.is_empty() {
        "nothing to do".to_string()
    } else {
        text.join(", ")
    }
}

/// Print a reconciliation report
pub fn report(title: &str, report: &Report) {
    let title = if report.dry_run {
        format!("{title} (dry run)")
    } else {
        title.to_string()
    };
    header(&title);

    for item in &report.items {
        match &item.result {
            ApplyResult::Failed { error } | ApplyResult::Skipped { reason: error } => {
                println!("  {} {} {}", symbol(&item.result), item.id, error.dimmed());
            }
            result => println!("  {} {}", symbol(result), item.id),
        }
    }
    println!();

    let line = summary_line(&report.summary);
    match (&report.verification, report.changed) {
        (_, false) => info(&format!("No changes ({line})")),
        (Verification::Unconfirmed { pending }, true) => {
            success(&line);
            warn(&format!("Not yet visible remotely: {}", pending.join(", ")));
        }
        (Verification::Skipped, true) => info(&format!("Would apply: {line}")),
        _ => success(&line),
    }
}
