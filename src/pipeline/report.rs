use log::{info, warn};
use std::path::Path;

use crate::RunStats;

/// `"66.7%"`, or the no-tasks message when nothing was scheduled.
pub fn format_success_rate(stats: &RunStats) -> String {
    match stats.success_rate() {
        Some(rate) => format!("{rate:.1}%"),
        None => "No files were scheduled for download.".to_string(),
    }
}

/// Log the final totals for a run.
pub fn print_report(stats: &RunStats, download_root: &Path) {
    info!("=== Processing completed ===");
    info!(
        "Total files identified and queued for download: {}",
        stats.tasks_enqueued
    );
    info!("Total files successfully downloaded: {}", stats.tasks_succeeded);
    match stats.success_rate() {
        Some(_) => info!("Download success rate: {}", format_success_rate(stats)),
        None => info!("{}", format_success_rate(stats)),
    }
    if stats.cancelled {
        warn!("Run was cancelled; remaining queued files were not downloaded");
    }
    info!("Files downloaded to: {}", download_root.display());
}
