//! The download queue.
//!
//! - [`processor`] - the [`DownloadQueue`] handle and its scheduling loop
//! - [`worker`] - per-item transfers and the [`ProgressReporter`]
//! - [`control`] - cooperative pause and cancellation
//! - [`session`] - batch statistics
//! - [`config`], [`builder`] - configuration

pub mod builder;
pub mod config;
pub mod control;
pub mod processor;
pub mod session;
pub mod worker;

pub use builder::QueueBuilder;
pub use config::{FailedItemPolicy, QueueConfig};
pub use control::QueueControl;
pub use processor::{DownloadQueue, QueueStatus};
pub use session::BatchSession;
pub use worker::ProgressReporter;
