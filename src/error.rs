//! Error handling for the haul library.
//!
//! Per-item transfer failures never escape the queue: a worker turns them into
//! a failed [`Summary`](crate::download::Summary) and the queue moves on. The
//! errors that do reach a caller are configuration problems detected by
//! [`DownloadQueue::enqueue`](crate::queue::DownloadQueue::enqueue) and the
//! errors returned by a [`RemoteSource`](crate::source::RemoteSource).

use std::io;
use thiserror::Error;

/// Errors that can happen when using haul.
#[derive(Error, Debug)]
pub enum Error {
    /// Error from an underlying system.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Error from the underlying URL parser or the expected URL format.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The queue was given settings it cannot work with.
    ///
    /// Returned before anything is queued, e.g. a concurrency limit of zero or
    /// a destination directory that cannot be created.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The remote source does not know the requested object.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A single item's transfer failed.
    ///
    /// The queue recovers from this locally and continues with the remaining
    /// items.
    #[error("Transfer failed: {0}")]
    Transfer(String),

    /// The transfer was interrupted because the queue was cancelled.
    ///
    /// This is the sentinel raised from inside progress reporting. It is not a
    /// failure and is never logged as one.
    #[error("Transfer aborted")]
    Aborted,

    /// I/O Error.
    #[error("I/O error")]
    IOError {
        #[from]
        source: io::Error,
    },

    /// Error from the Reqwest library.
    #[error("Reqwest Error")]
    Reqwest {
        #[from]
        source: reqwest::Error,
    },

    /// Error from the HTTP middleware stack (retries, tracing).
    #[error("HTTP middleware error")]
    Middleware {
        #[from]
        source: reqwest_middleware::Error,
    },
}

impl Error {
    /// Returns `true` for the cancellation sentinel.
    pub fn is_abort(&self) -> bool {
        matches!(self, Error::Aborted)
    }
}

/// Result type alias for operations that can fail with a haul error.
pub type Result<T> = std::result::Result<T, Error>;
