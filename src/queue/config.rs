//! Configuration structures and defaults for the queue.
//!
//! [`QueueConfig`] is filled in by the [`QueueBuilder`](super::QueueBuilder)
//! and frozen when the queue is built. Only the concurrency limit and the
//! destination can also be chosen per call to
//! [`DownloadQueue::enqueue`](super::DownloadQueue::enqueue).
//!
//! # Examples
//!
//! ```rust
//! use haul::queue::{FailedItemPolicy, QueueConfig};
//! use std::time::Duration;
//!
//! let config = QueueConfig {
//!     concurrency_limit: 4,
//!     failed_items: FailedItemPolicy::Count,
//!     progress_interval: Duration::from_millis(250),
//!     ..QueueConfig::default()
//! };
//! assert_eq!(config.batch_label, "BATCH");
//! ```

use crate::events::EventCallback;
use crate::progress::StyleOptions;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Default number of simultaneous transfers.
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Default destination directory, relative to the working directory.
pub const DEFAULT_DESTINATION: &str = "Downloads";

/// How failed items weigh in the batch aggregate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailedItemPolicy {
    /// Drop failed items from both the numerator and the denominator, so a
    /// batch with failures can still reach 100%.
    #[default]
    Exclude,
    /// Keep failed items in the total; the batch then stays below 100%.
    Count,
}

/// Configuration structure for the queue.
#[derive(Clone)]
pub struct QueueConfig {
    /// Maximum number of transfers in flight when none is given at enqueue.
    pub concurrency_limit: usize,
    /// Directory used when none is given at enqueue.
    pub destination: PathBuf,
    /// Backstop interval for re-checking flags while idle or paused.
    pub poll_interval: Duration,
    /// Minimum delay between two progress events of one item.
    pub progress_interval: Duration,
    /// How failed items count towards the batch aggregate.
    pub failed_items: FailedItemPolicy,
    /// Label of the batch progress line.
    pub batch_label: String,
    /// Progress bar style options.
    pub style_options: StyleOptions,
    /// Callbacks receiving every queue notification, in registration order.
    pub on_event: Vec<Arc<EventCallback>>,
}

impl std::fmt::Debug for QueueConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueConfig")
            .field("concurrency_limit", &self.concurrency_limit)
            .field("destination", &self.destination)
            .field("poll_interval", &self.poll_interval)
            .field("progress_interval", &self.progress_interval)
            .field("failed_items", &self.failed_items)
            .field("batch_label", &self.batch_label)
            .field("style_options", &self.style_options)
            .field("on_event", &self.on_event.len())
            .finish()
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: DEFAULT_CONCURRENCY,
            destination: PathBuf::from(DEFAULT_DESTINATION),
            poll_interval: Duration::from_millis(100),
            progress_interval: Duration::from_millis(100),
            failed_items: FailedItemPolicy::default(),
            batch_label: "BATCH".to_string(),
            style_options: StyleOptions::default(),
            on_event: Vec::new(),
        }
    }
}
