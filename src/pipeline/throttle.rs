//! Shared success counter and per-worker throttling.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Process-wide count of successful downloads. Only ever increases.
#[derive(Debug, Default)]
pub struct ProgressCounter {
    total: Mutex<usize>,
}

impl ProgressCounter {
    /// Add one and return the new total from the same lock acquisition.
    pub fn increment(&self) -> usize {
        let mut total = self.total.lock().unwrap_or_else(PoisonError::into_inner);
        *total += 1;
        *total
    }

    pub fn get(&self) -> usize {
        *self.total.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Pause source for throttling. Swapped for a recording stub in tests.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Sleeps the calling thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// When a worker should pause: every time the global success count hits a multiple of
/// `every`. Each worker checks the snapshot its own increment returned, so every boundary is
/// observed by exactly one worker while the others keep downloading. The pause is per worker, not
/// a global stall: with N workers the service still sees up to N-1 concurrent transfers during a
/// pause, and a fast worker can reach the next boundary while another is still sleeping. Both are
/// accepted pacing behaviour; do not replace this with a shared pause.
#[derive(Clone, Copy, Debug)]
pub struct ThrottlePolicy {
    /// 0 disables throttling.
    pub every: u64,
    pub interval: Duration,
}

impl ThrottlePolicy {
    pub fn should_pause(&self, total: usize) -> bool {
        self.every > 0 && total > 0 && (total as u64).is_multiple_of(self.every)
    }
}
