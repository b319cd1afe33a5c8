//! Builder pattern implementation for creating [`DownloadQueue`] instances.
//!
//! # Examples
//!
//! ```rust
//! use haul::events::QueueEvent;
//! use haul::queue::FailedItemPolicy;
//! use haul::{HttpSource, QueueBuilder};
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let queue = QueueBuilder::new()
//!     .concurrency_limit(2)
//!     .destination("./downloads")
//!     .progress_interval(Duration::from_millis(250))
//!     .failed_items(FailedItemPolicy::Count)
//!     .on_event(|n| {
//!         if let QueueEvent::BatchProgress(s) = &n.event {
//!             println!("{}% {}", s.percent, s.size_str());
//!         }
//!     })
//!     .build(HttpSource::default());
//! # }
//! ```
//!
//! ## Hidden Progress Bars
//!
//! ```rust
//! use haul::{HttpSource, QueueBuilder};
//!
//! // Only the registered callbacks see progress.
//! let queue = QueueBuilder::hidden().build(HttpSource::default());
//! ```

use super::config::{FailedItemPolicy, QueueConfig};
use super::processor::DownloadQueue;
use crate::events::Notification;
use crate::progress::{ProgressBarOpts, StyleOptions};
use crate::source::RemoteSource;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// A builder used to create a [`DownloadQueue`].
#[derive(Debug, Default)]
pub struct QueueBuilder {
    config: QueueConfig,
}

impl QueueBuilder {
    /// Creates a builder with the default options.
    pub fn new() -> Self {
        QueueBuilder::default()
    }

    /// Convenience function to hide the progress bars.
    pub fn hidden() -> Self {
        let mut builder = QueueBuilder::default();
        builder.config.style_options =
            StyleOptions::new(ProgressBarOpts::hidden(), ProgressBarOpts::hidden());
        builder
    }

    /// Set the concurrency limit used by [`DownloadQueue::submit`].
    pub fn concurrency_limit(mut self, limit: usize) -> Self {
        self.config.concurrency_limit = limit;
        self
    }

    /// Set the directory used by [`DownloadQueue::submit`].
    pub fn destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.config.destination = destination.into();
        self
    }

    /// Set how often the processor re-checks its flags when nothing wakes it.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Set the minimum delay between two progress events of one item.
    pub fn progress_interval(mut self, interval: Duration) -> Self {
        self.config.progress_interval = interval;
        self
    }

    /// Set how failed items count towards the batch percentage.
    pub fn failed_items(mut self, policy: FailedItemPolicy) -> Self {
        self.config.failed_items = policy;
        self
    }

    /// Set the label of the batch progress line.
    pub fn batch_label(mut self, label: impl Into<String>) -> Self {
        self.config.batch_label = label.into();
        self
    }

    /// Set the progress bar style options.
    pub fn style_options(mut self, style_options: StyleOptions) -> Self {
        self.config.style_options = style_options;
        self
    }

    /// Register a callback for every queue notification.
    ///
    /// Can be called several times; callbacks run in registration order on
    /// the task that emitted the event.
    pub fn on_event<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        self.config.on_event.push(Arc::new(Box::new(callback)));
        self
    }

    /// The configuration built so far.
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Create the [`DownloadQueue`] with the specified options.
    pub fn build<S: RemoteSource>(self, source: S) -> DownloadQueue<S> {
        DownloadQueue::new(self.config, source)
    }
}
