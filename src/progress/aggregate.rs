//! Per-item and batch progress math.
//!
//! Every snapshot is recomputed from raw byte counters and elapsed time, so a
//! batch whose total grows mid-flight never carries stale derived state.

use crate::utils::{
    format_batch_size, format_clock_hms, format_clock_ms, format_item_size, format_speed, MIB,
};
use std::time::Duration;

/// Lower bound for elapsed time, in seconds, to keep rates finite.
const ELAPSED_EPSILON: f64 = 0.001;

/// Where an item is in its lifecycle when a snapshot is taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ItemState {
    /// Bytes are still flowing.
    #[default]
    Running,
    /// The transfer completed.
    Done,
    /// The transfer failed.
    Failed,
}

/// Point-in-time progress of one item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemSnapshot {
    /// File name of the item.
    pub name: String,
    /// Lifecycle state.
    pub state: ItemState,
    /// `floor(100 * current / total)`.
    pub percent: u8,
    /// Bytes transferred so far.
    pub current: u64,
    /// Expected size in bytes.
    pub total: u64,
    /// Bytes per second since the item started.
    pub speed: f64,
    /// Estimated time left.
    pub eta: Duration,
}

impl ItemSnapshot {
    /// Throughput as text, or the terminal marker (`DONE` / `FAILED`).
    pub fn speed_str(&self) -> String {
        match self.state {
            ItemState::Running => format_speed(self.speed),
            ItemState::Done => "DONE".to_string(),
            ItemState::Failed => "FAILED".to_string(),
        }
    }

    /// Remaining time as `MM:SS`.
    pub fn eta_str(&self) -> String {
        match self.state {
            ItemState::Failed => "--:--".to_string(),
            _ => format_clock_ms(self.eta),
        }
    }

    /// Transferred/expected size in megabytes.
    pub fn size_str(&self) -> String {
        match self.state {
            ItemState::Done => format!("{:.1} MB", self.total as f64 / MIB),
            _ => format_item_size(self.current, self.total),
        }
    }
}

/// Point-in-time progress of the whole batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSnapshot {
    /// Display label of the batch.
    pub label: String,
    /// `floor(100 * current / total)`, never decreasing within a batch.
    pub percent: u8,
    /// Bytes transferred across all counted items.
    pub current: u64,
    /// Expected bytes across all counted items.
    pub total: u64,
    /// Bytes per second since the batch started.
    pub speed: f64,
    /// Estimated time left.
    pub eta: Duration,
}

impl BatchSnapshot {
    /// Throughput as text.
    pub fn speed_str(&self) -> String {
        format_speed(self.speed)
    }

    /// Remaining time as `HH:MM:SS`.
    pub fn eta_str(&self) -> String {
        format_clock_hms(self.eta)
    }

    /// Transferred/expected size in megabytes.
    pub fn size_str(&self) -> String {
        format_batch_size(self.current, self.total)
    }
}

/// Integer percentage, clamped to 100. A zero total yields 0.
pub fn percent(current: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    (u128::from(current.min(total)) * 100 / u128::from(total)) as u8
}

/// Average rate over `elapsed`.
pub fn rate(bytes: u64, elapsed: Duration) -> f64 {
    bytes as f64 / elapsed.as_secs_f64().max(ELAPSED_EPSILON)
}

/// Time needed to move the remaining bytes at `speed`; zero when idle.
pub fn remaining(current: u64, total: u64, speed: f64) -> Duration {
    if speed <= 0.0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(total.saturating_sub(current) as f64 / speed)
}

/// Progress of a running item.
pub fn item_snapshot(name: &str, current: u64, total: u64, elapsed: Duration) -> ItemSnapshot {
    let speed = rate(current, elapsed);
    ItemSnapshot {
        name: name.to_string(),
        state: ItemState::Running,
        percent: percent(current, total),
        current,
        total,
        speed,
        eta: remaining(current, total, speed),
    }
}

/// Progress of a batch from its summed counters.
pub fn batch_snapshot(label: &str, current: u64, total: u64, elapsed: Duration) -> BatchSnapshot {
    let speed = rate(current, elapsed);
    BatchSnapshot {
        label: label.to_string(),
        percent: percent(current, total),
        current,
        total,
        speed,
        eta: remaining(current, total, speed),
    }
}
