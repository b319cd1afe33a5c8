//! Haul is a download queue: items are drained from a growing FIFO by a
//! bounded pool of concurrent transfers, with cooperative pause and cancel
//! and live per-item and batch progress.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use haul::{HttpSource, QueueBuilder};
//!
//! # #[tokio::main]
//! # async fn main() -> haul::Result<()> {
//! let source = HttpSource::default();
//! let items = vec![
//!     source.item("https://example.com/media/intro.mp4").await?,
//!     source.item("https://example.com/media/keynote.mp4").await?,
//! ];
//!
//! let queue = QueueBuilder::new().build(source);
//! queue.enqueue(items, 2, "Downloads").await?;
//!
//! let report = queue.wait_idle().await.expect("a batch ran");
//! for summary in &report.summaries {
//!     println!("{}: {:?}", summary.name(), summary.status());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Module Organization
//!
//! - [`queue`] - the [`DownloadQueue`], its workers, pause/cancel control and
//!   batch statistics
//! - [`source`] - the [`RemoteSource`] trait transfers go through
//! - [`http`] - an HTTP [`RemoteSource`] built on reqwest
//! - [`download`] - items, file naming, per-item summaries and batch reports
//! - [`progress`] - snapshot math, throttling and terminal progress bars
//! - [`events`] - notifications emitted while a batch runs
//! - [`error`] - centralized error handling with the [`Error`] enum
//! - [`utils`] - formatting and HTTP size helpers

pub mod download;
pub mod error;
pub mod events;
pub mod http;
pub mod progress;
pub mod queue;
pub mod source;
pub mod utils;

pub use download::{BatchOutcome, BatchReport, DownloadItem, Status, Summary};
pub use error::{Error, Result};
pub use events::{Notification, QueueEvent};
pub use http::{create_http_client, HttpClientConfig, HttpObject, HttpSource};
pub use progress::{BatchSnapshot, ItemSnapshot, ItemState, ProgressBarOpts, StyleOptions};
pub use queue::{
    DownloadQueue, FailedItemPolicy, ProgressReporter, QueueBuilder, QueueControl, QueueStatus,
};
pub use source::RemoteSource;
