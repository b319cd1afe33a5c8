//! Emission rate limiting for progress samples.

use std::time::{Duration, Instant};

/// Lets through at most one sample per interval.
///
/// The first sample and any sample flagged as final always pass.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last: Option<Instant>,
}

impl Throttle {
    /// Create a throttle with the given minimum spacing.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Decide whether a sample taken at `now` should be emitted.
    pub fn ready(&mut self, now: Instant, last_sample: bool) -> bool {
        let due = match self.last {
            None => true,
            Some(last) => last_sample || now.saturating_duration_since(last) >= self.interval,
        };
        if due {
            self.last = Some(now);
        }
        due
    }
}
