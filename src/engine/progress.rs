//! Progress bar utilities for displaying download status

use kdam::{Animation, Bar, BarExt};
use std::sync::{Arc, Mutex, PoisonError};

// Progress bar type alias
pub type ProgressBar = Arc<Mutex<Bar>>;

/// Configuration for creating a progress bar
pub struct ProgressBarConfig {
    pub total: usize,
    pub desc: &'static str,
    pub animation: Animation,
}

impl ProgressBarConfig {
    /// Create a new progress bar configuration
    pub fn new(total: usize, desc: &'static str, animation: Animation) -> Self {
        Self {
            total,
            desc,
            animation,
        }
    }
}

/// Create a progress bar with the given configuration
pub fn create_progress_bar(config: ProgressBarConfig) -> ProgressBar {
    Arc::new(Mutex::new(kdam::tqdm!(
        total = config.total,
        desc = config.desc,
        animation = config.animation,
        unit = " files"
    )))
}

/// Bar for a download run. Total starts at 0 and grows as the producer queues tasks.
pub fn create_download_bar() -> ProgressBar {
    let bar = create_progress_bar(ProgressBarConfig::new(0, "Downloading", Animation::Classic));
    refresh_bar(&bar);
    bar
}

/// Update the bar's total (the producer calls this as the queue grows). Refreshes the display.
pub fn set_bar_total(pb: &ProgressBar, total: usize) {
    let mut bar = pb.lock().unwrap_or_else(PoisonError::into_inner);
    bar.total = total;
    let _ = bar.refresh();
}

/// Force a refresh of the bar (e.g. so "0 files" shows immediately).
pub fn refresh_bar(pb: &ProgressBar) {
    if let Ok(mut bar) = pb.try_lock() {
        let _ = bar.refresh();
    }
}

/// Advance the bar by `n` finished tasks.
pub fn update_progress_bar(pb: &ProgressBar, n: usize) {
    let mut bar = pb.lock().unwrap_or_else(PoisonError::into_inner);
    let _ = bar.update(n);
}
