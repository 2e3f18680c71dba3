//! Progress tracking and scan timing
//!
//! Thread-safe counters updated by probe tasks and read by the progress
//! reporter without locking the engine's result state.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Lock-free progress counters for one scan
///
/// # Examples
///
/// ```
/// use svcscan_core::ScanProgress;
///
/// let progress = ScanProgress::new(4);
/// progress.increment_completed();
/// assert_eq!(progress.completed(), 1);
/// assert_eq!(progress.remaining(), 3);
/// ```
#[derive(Debug)]
pub struct ScanProgress {
    total: usize,
    completed: AtomicUsize,
}

impl ScanProgress {
    /// Create a tracker for the given number of probe tasks
    pub fn new(total: usize) -> Self {
        Self {
            total,
            completed: AtomicUsize::new(0),
        }
    }

    /// Total number of probe tasks in the scan
    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of completed probe tasks
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    /// Number of probe tasks still outstanding
    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.completed())
    }

    /// Mark one probe task complete
    pub fn increment_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Completion percentage in `[0, 100]`
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        100.0 * self.completed() as f64 / self.total as f64
    }

    /// One-line progress summary for keystroke-triggered display
    pub fn status_line(&self) -> String {
        let remaining = self.remaining();
        format!(
            "Approximately {:.1}% complete ({} {} remaining)",
            self.percentage(),
            remaining,
            if remaining == 1 { "port" } else { "ports" }
        )
    }
}

/// Wall-clock scan timer
///
/// Tracks the start and end instants of a scan for the report summary.
#[derive(Debug, Clone)]
pub struct Timer {
    started: Option<(DateTime<Utc>, Instant)>,
    ended: Option<(DateTime<Utc>, Instant)>,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            started: None,
            ended: None,
        }
    }

    /// Start the timer, recording the wall-clock start time
    pub fn start(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        self.started = Some((now, Instant::now()));
        self.ended = None;
        now
    }

    /// Stop the timer, recording the wall-clock end time
    pub fn stop(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        self.ended = Some((now, Instant::now()));
        now
    }

    /// Wall-clock time the scan began
    pub fn beg_time(&self) -> Option<DateTime<Utc>> {
        self.started.map(|(at, _)| at)
    }

    /// Wall-clock time the scan ended
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.ended.map(|(at, _)| at)
    }

    /// Elapsed duration between start and stop (or now, while running)
    pub fn elapsed(&self) -> Duration {
        match (self.started, self.ended) {
            (Some((_, beg)), Some((_, end))) => end.duration_since(beg),
            (Some((_, beg)), None) => beg.elapsed(),
            _ => Duration::ZERO,
        }
    }

    /// Human-readable elapsed time, e.g. `2.145 seconds`
    pub fn elapsed_str(&self) -> String {
        format!("{:.3} seconds", self.elapsed().as_secs_f64())
    }

    /// Format a wall-clock timestamp for console display
    pub fn timestamp(at: DateTime<Utc>) -> String {
        at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
