//! One transfer, from admission to its summary.

use super::control::QueueControl;
use super::session::BatchTracker;
use crate::download::{DownloadItem, Status, Summary};
use crate::error::{Error, Result};
use crate::events::QueueEvent;
use crate::progress::aggregate::rate;
use crate::progress::{item_snapshot, ItemSnapshot, ItemState, Throttle};
use crate::source::RemoteSource;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// An item waiting for a worker, with the directory it was enqueued for.
#[derive(Debug)]
pub(crate) struct Job<H> {
    pub(crate) item: DownloadItem<H>,
    pub(crate) destination: PathBuf,
}

/// Handed to [`RemoteSource::transfer`] to report bytes as they land.
///
/// Every report is also the point where a transfer observes the queue: it
/// waits there while the queue is paused and gets [`Error::Aborted`] back once
/// the queue is cancelled.
pub struct ProgressReporter {
    name: String,
    expected: u64,
    current: u64,
    started: Instant,
    throttle: Throttle,
    poll: Duration,
    token: CancellationToken,
    control: Arc<QueueControl>,
    tracker: Arc<BatchTracker>,
    aborted: bool,
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("name", &self.name)
            .field("expected", &self.expected)
            .field("current", &self.current)
            .field("aborted", &self.aborted)
            .finish()
    }
}

impl ProgressReporter {
    pub(crate) fn new(
        name: &str,
        expected: u64,
        control: Arc<QueueControl>,
        tracker: Arc<BatchTracker>,
        interval: Duration,
        poll: Duration,
    ) -> Self {
        Self {
            name: name.to_string(),
            expected,
            current: 0,
            started: Instant::now(),
            throttle: Throttle::new(interval),
            poll,
            token: control.token(),
            control,
            tracker,
            aborted: false,
        }
    }

    /// Report that `current` of `total` bytes have been transferred.
    ///
    /// `total` is only used when the item was enqueued with an unknown size.
    /// Reports never move the counter backwards and never exceed the expected
    /// size.
    ///
    /// # Errors
    ///
    /// [`Error::Aborted`] when the queue was cancelled, either before the call
    /// or while it waited out a pause. Return it from the transfer unchanged.
    pub async fn update(&mut self, current: u64, total: u64) -> Result<()> {
        if self.is_cancelled() {
            self.aborted = true;
            return Err(Error::Aborted);
        }
        if self.control.is_paused() {
            if let Err(e) = self.control.wait_while_paused(self.poll).await {
                self.aborted = true;
                return Err(e);
            }
        }

        if self.expected == 0 && total > 0 {
            self.expected = total;
            self.tracker.resize(&self.name, total);
        }
        let current = if self.expected > 0 {
            current.min(self.expected)
        } else {
            current
        };
        self.current = self.current.max(current);
        self.tracker.record(&self.name, self.current);

        let last = self.expected > 0 && self.current >= self.expected;
        if self.throttle.ready(Instant::now(), last) {
            self.tracker
                .emit(QueueEvent::ItemProgress(self.snapshot(ItemState::Running)));
            self.tracker.publish();
        }
        Ok(())
    }

    /// Token that fires when the queue is cancelled.
    ///
    /// Useful to abandon a blocking read without waiting for the next report.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Highest byte count reported so far.
    pub fn current(&self) -> u64 {
        self.current
    }

    /// Expected size of the item, zero while unknown.
    pub fn expected(&self) -> u64 {
        self.expected
    }

    /// Whether a report observed cancellation.
    pub fn aborted(&self) -> bool {
        self.aborted
    }

    fn is_cancelled(&self) -> bool {
        self.token.is_cancelled() || self.control.is_cancelled()
    }

    fn snapshot(&self, state: ItemState) -> ItemSnapshot {
        let mut snapshot = item_snapshot(
            &self.name,
            self.current,
            self.expected,
            self.started.elapsed(),
        );
        snapshot.state = state;
        snapshot
    }

    fn done_snapshot(&self, total: u64) -> ItemSnapshot {
        ItemSnapshot {
            name: self.name.clone(),
            state: ItemState::Done,
            percent: 100,
            current: total,
            total,
            speed: rate(total, self.started.elapsed()),
            eta: Duration::ZERO,
        }
    }
}

/// Runs admitted jobs against a source.
pub(crate) struct Worker<S> {
    pub(crate) source: Arc<S>,
    pub(crate) control: Arc<QueueControl>,
    pub(crate) tracker: Arc<BatchTracker>,
    pub(crate) progress_interval: Duration,
    pub(crate) poll_interval: Duration,
}

impl<S> Clone for Worker<S> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            control: self.control.clone(),
            tracker: self.tracker.clone(),
            progress_interval: self.progress_interval,
            poll_interval: self.poll_interval,
        }
    }
}

impl<S: RemoteSource> Worker<S> {
    /// Transfer one item and turn the outcome into a [`Summary`].
    ///
    /// Errors never escape: a failure is logged, counted and summarized.
    pub(crate) async fn run(self, job: Job<S::Handle>) -> Summary {
        let Job { item, destination } = job;
        let summary = Summary::new(&item);
        if self.control.is_cancelled() {
            return summary.abort();
        }

        let name = item.name();
        let path = destination.join(name);
        debug!(name, path = %path.display(), size = item.size(), "transfer starting");
        self.tracker.emit(QueueEvent::Started {
            name: name.to_string(),
        });

        let mut reporter = ProgressReporter::new(
            name,
            item.size(),
            self.control.clone(),
            self.tracker.clone(),
            self.progress_interval,
            self.poll_interval,
        );
        let result = self
            .source
            .transfer(item.handle(), &path, &mut reporter)
            .await;

        match result {
            Ok(_) if reporter.aborted() => {
                debug!(name, "transfer aborted");
                remove_partial(&path).await;
                summary.with_transferred(reporter.current()).abort()
            }
            Ok(written) => {
                let total = match reporter.expected() {
                    0 => written.max(reporter.current()),
                    expected => expected,
                };
                if reporter.expected() == 0 {
                    self.tracker.resize(name, total);
                }
                self.tracker.complete(name);
                self.tracker
                    .emit(QueueEvent::ItemProgress(reporter.done_snapshot(total)));
                self.tracker.publish();
                debug!(name, bytes = written, "transfer done");
                summary.with_transferred(total).with_status(Status::Done)
            }
            Err(Error::Aborted) => {
                debug!(name, "transfer aborted");
                remove_partial(&path).await;
                summary.with_transferred(reporter.current()).abort()
            }
            Err(e) => {
                warn!(name, error = %e, "transfer failed");
                self.tracker.fail(name);
                self.tracker
                    .emit(QueueEvent::ItemProgress(reporter.snapshot(ItemState::Failed)));
                self.tracker.publish();
                remove_partial(&path).await;
                summary.with_transferred(reporter.current()).fail(e)
            }
        }
    }
}

impl<S> Worker<S> {
    /// Close out an item whose transfer panicked.
    ///
    /// Mirrors a failed transfer: the item is counted as failed, its terminal
    /// `FAILED` snapshot is emitted with the last recorded byte count and the
    /// partial file is removed.
    pub(crate) async fn fail_panicked(
        &self,
        summary: Summary,
        path: &Path,
        started: Instant,
    ) -> Summary {
        let name = summary.name().to_string();
        warn!(name = %name, "worker panicked");
        let (current, total) = self.tracker.progress(&name).unwrap_or_default();
        self.tracker.fail(&name);
        let mut snapshot = item_snapshot(&name, current, total, started.elapsed());
        snapshot.state = ItemState::Failed;
        self.tracker.emit(QueueEvent::ItemProgress(snapshot));
        self.tracker.publish();
        remove_partial(path).await;
        summary.with_transferred(current).fail("worker panicked")
    }
}

async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "partial file removed"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "could not remove partial file"),
    }
}
