//! Thinking-time tracking.
//!
//! One timer per logical assistant message. "Continue generation" resumes
//! counting on top of a previously persisted duration instead of starting
//! over, so the timer accumulates across start/stop cycles.

use std::time::{Duration, Instant};

#[derive(Debug, Default)]
pub struct StreamTimer {
    started_at: Option<Instant>,
    accumulated: Duration,
}

impl StreamTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A timer pre-loaded with an already-spent duration, for resuming a
    /// continued message.
    pub fn resume_from(ms: u64) -> Self {
        Self {
            started_at: None,
            accumulated: Duration::from_millis(ms),
        }
    }

    /// Start counting. A no-op if already running.
    pub fn start(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
    }

    /// Stop counting and return the cumulative total in milliseconds.
    /// Stopping an already-stopped timer just returns the known total.
    pub fn stop(&mut self) -> u64 {
        if let Some(started) = self.started_at.take() {
            self.accumulated += started.elapsed();
        }
        self.total_ms()
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    /// Cumulative total so far, including a live run.
    pub fn total_ms(&self) -> u64 {
        let live = self
            .started_at
            .map(|s| s.elapsed())
            .unwrap_or(Duration::ZERO);
        (self.accumulated + live).as_millis() as u64
    }

    /// The settled duration for display: what has been banked by previous
    /// stops or a resume. `None` while nothing has been banked yet, so a
    /// fresh stream shows no label until its thinking phase ends.
    pub fn banked_ms(&self) -> Option<u64> {
        let ms = self.accumulated.as_millis() as u64;
        (ms > 0).then_some(ms)
    }
}
