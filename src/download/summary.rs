//! Per-item results and the end-of-batch report.

use super::item::DownloadItem;
use crate::progress::BatchSnapshot;

/// Terminal (or not yet terminal) state of an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// The item never left the pending queue.
    NotStarted,
    /// Every byte landed on disk.
    Done,
    /// The transfer failed with an error message.
    Failed(String),
    /// The transfer was interrupted or discarded by cancellation.
    Aborted,
}

impl Status {
    /// Whether the item reached a final state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Status::NotStarted)
    }
}

/// Represents a [`DownloadItem`] summary.
#[derive(Debug, Clone)]
pub struct Summary {
    id: String,
    name: String,
    caption: String,
    expected: u64,
    transferred: u64,
    status: Status,
}

impl Summary {
    /// Create a [`Summary`] for an item that has not started yet.
    pub fn new<H>(item: &DownloadItem<H>) -> Self {
        Self {
            id: item.id().to_string(),
            name: item.name().to_string(),
            caption: item.caption().to_string(),
            expected: item.size(),
            transferred: 0,
            status: Status::NotStarted,
        }
    }

    /// Attach a status to a [`Summary`].
    pub fn with_status(self, status: Status) -> Self {
        Self { status, ..self }
    }

    /// Record how many bytes were transferred.
    pub fn with_transferred(self, transferred: u64) -> Self {
        Self {
            transferred,
            ..self
        }
    }

    /// Mark the summary as failed with a message.
    pub fn fail(self, msg: impl std::fmt::Display) -> Self {
        self.with_status(Status::Failed(msg.to_string()))
    }

    /// Mark the summary as aborted.
    pub fn abort(self) -> Self {
        self.with_status(Status::Aborted)
    }

    /// Item id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// File name the item was stored under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Display caption.
    pub fn caption(&self) -> &str {
        &self.caption
    }

    /// Expected size in bytes.
    pub fn expected(&self) -> u64 {
        self.expected
    }

    /// Bytes transferred.
    pub fn transferred(&self) -> u64 {
        self.transferred
    }

    /// Get a reference to the summary's status.
    pub fn status(&self) -> &Status {
        &self.status
    }
}

/// How a batch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// The queue drained with every item in a terminal state.
    Finished,
    /// The queue was drained by cancellation.
    Aborted,
}

/// Everything known about a batch once it is over.
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// How the batch ended.
    pub outcome: BatchOutcome,
    /// One summary per item, in completion order followed by discarded items.
    pub summaries: Vec<Summary>,
    /// Aggregate progress computed from the final byte counters.
    pub snapshot: BatchSnapshot,
}

impl BatchReport {
    /// Summaries of items that completed.
    pub fn done(&self) -> impl Iterator<Item = &Summary> {
        self.with(|s| matches!(s, Status::Done))
    }

    /// Summaries of items that failed.
    pub fn failed(&self) -> impl Iterator<Item = &Summary> {
        self.with(|s| matches!(s, Status::Failed(_)))
    }

    /// Summaries of items that were aborted or never started.
    pub fn aborted(&self) -> impl Iterator<Item = &Summary> {
        self.with(|s| matches!(s, Status::Aborted))
    }

    /// Look up a summary by file name.
    pub fn get(&self, name: &str) -> Option<&Summary> {
        self.summaries.iter().find(|s| s.name() == name)
    }

    fn with(&self, pred: impl Fn(&Status) -> bool) -> impl Iterator<Item = &Summary> {
        self.summaries.iter().filter(move |s| pred(s.status()))
    }
}
