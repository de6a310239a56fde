//! Progress tracking utilities
//!
//! A thread-safe counter that logs a line every time it crosses a multiple of its
//! interval. The sink uses it to report how many records have been spilled.

use log::info;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe progress tracker for logging progress at regular intervals.
///
/// # Example
/// ```
/// use compscore_lib::progress::ProgressTracker;
///
/// let tracker = ProgressTracker::new("Spilled records").with_interval(100);
/// for _ in 0..250 {
///     tracker.record(1); // Logs at 100, 200
/// }
/// tracker.log_final(); // Logs "Spilled records 250 (complete)"
/// ```
pub struct ProgressTracker {
    interval: u64,
    message: String,
    count: AtomicU64,
}

impl ProgressTracker {
    /// Create a new tracker with a default interval of 100,000.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self { interval: 100_000, message: message.into(), count: AtomicU64::new(0) }
    }

    /// Set the logging interval. A zero interval is treated as one.
    #[must_use]
    pub fn with_interval(mut self, interval: u64) -> Self {
        self.interval = interval.max(1);
        self
    }

    /// Add `additional` to the count, logging once per interval boundary crossed.
    ///
    /// Returns `true` if the new count sits exactly on an interval boundary.
    pub fn record(&self, additional: u64) -> bool {
        let prev = self.count.fetch_add(additional, Ordering::Relaxed);
        let new_count = prev + additional;

        for i in (prev / self.interval + 1)..=(new_count / self.interval) {
            info!("{} {}", self.message, i * self.interval);
        }

        new_count > 0 && new_count.is_multiple_of(self.interval)
    }

    /// Log the final count unless the last `record` call already logged it.
    pub fn log_final(&self) {
        let count = self.count();
        if count > 0 && !count.is_multiple_of(self.interval) {
            info!("{} {} (complete)", self.message, count);
        }
    }

    /// Current count.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}
