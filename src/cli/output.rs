//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use chrono::{DateTime, Utc};
use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::vault::VaultSummary;

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Format epoch seconds as a UTC timestamp.
pub fn format_epoch(secs: u64) -> String {
    i64::try_from(secs)
        .ok()
        .and_then(|s| DateTime::<Utc>::from_timestamp(s, 0))
        .map_or_else(|| "-".to_string(), |dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Lockout column text: attempts so far, or time left when locked.
pub fn lock_status(summary: &VaultSummary) -> String {
    if summary.remaining_lockout_secs > 0 {
        format!("locked {}s", summary.remaining_lockout_secs)
    } else {
        format!("{}/{} failed", summary.attempts, summary.max_attempts)
    }
}

/// Print a table of sealed folders.
pub fn print_vaults_table(vaults: &[VaultSummary]) {
    if vaults.is_empty() {
        info("No sealed folders yet.");
        tip("Run `foldervault lock <PATH>` to seal your first folder.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Folder", "Sealed as", "Mode", "Sealed at", "Attempts"]);

    for v in vaults {
        let status = if v.remaining_lockout_secs > 0 {
            style(lock_status(v)).red().to_string()
        } else {
            lock_status(v)
        };
        table.add_row(vec![
            v.original_path.display().to_string(),
            v.container_path.display().to_string(),
            v.protection.to_string(),
            format_epoch(v.sealed_at),
            status,
        ]);
    }

    println!("{table}");
}
