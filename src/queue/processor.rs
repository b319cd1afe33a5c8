//! The queue processor.
//!
//! A [`DownloadQueue`] owns the pending FIFO and the set of active workers.
//! The first enqueue on an idle queue starts a batch and spawns the processor
//! task; the task admits pending items whenever a semaphore permit is free and
//! the queue is not paused, and ends the batch once nothing is pending and no
//! worker is left.
//!
//! ```text
//!            enqueue                 pending and active empty
//!   Idle ─────────────▶ Running ──────────────────────────▶ Completing ─┐
//!    ▲                     │ cancel                                     │
//!    │                     ▼                                            │
//!    └──────────────── Draining ◀───────────────────────────────────────┘
//!          report published, session reset (next batch if items arrived)
//! ```
//!
//! All phase transitions happen under one lock together with the pending
//! queue and the active set. Workers update their byte counters through the
//! batch session, which has its own lock taken after the state lock.
//!
//! # Examples
//!
//! ```rust,no_run
//! use haul::{HttpSource, QueueBuilder};
//!
//! # async fn example() -> haul::Result<()> {
//! let source = HttpSource::default();
//! let item = source.item("https://example.com/talk.mp4").await?;
//!
//! let queue = QueueBuilder::new().build(source);
//! queue.enqueue(vec![item], 2, "downloads").await?;
//!
//! if let Some(report) = queue.wait_idle().await {
//!     println!("{} done, {} failed", report.done().count(), report.failed().count());
//! }
//! # Ok(())
//! # }
//! ```

use super::config::QueueConfig;
use super::control::QueueControl;
use super::session::BatchTracker;
use super::worker::{Job, Worker};
use crate::download::{unique_name, BatchOutcome, BatchReport, DownloadItem, Summary};
use crate::error::{Error, Result};
use crate::events::{EventEmitter, QueueEvent};
use crate::progress::ProgressDisplay;
use crate::source::RemoteSource;

use futures::FutureExt;
use std::collections::{HashSet, VecDeque};
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tokio::sync::{watch, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, warn};

/// Lifecycle phase of the processor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueueStatus {
    /// No batch is running.
    #[default]
    Idle,
    /// Items are being admitted and transferred.
    Running,
    /// Cancellation was observed; pending items are discarded and in-flight
    /// workers are winding down.
    Draining,
    /// The batch drained cleanly and is being closed.
    Completing,
}

/// Items of one enqueue call, with the file names already present in their
/// destination when they arrived.
struct Arrival<H> {
    jobs: Vec<Job<H>>,
    on_disk: HashSet<String>,
}

struct QueueState<H> {
    phase: QueueStatus,
    pending: VecDeque<Job<H>>,
    active: HashSet<String>,
    limit: usize,
    summaries: Vec<Summary>,
    /// Items that arrived while a batch was closing.
    deferred: Vec<Arrival<H>>,
    deferred_limit: Option<usize>,
}

impl<H> Default for QueueState<H> {
    fn default() -> Self {
        Self {
            phase: QueueStatus::Idle,
            pending: VecDeque::new(),
            active: HashSet::new(),
            limit: 1,
            summaries: Vec::new(),
            deferred: Vec::new(),
            deferred_limit: None,
        }
    }
}

struct Inner<S: RemoteSource> {
    config: QueueConfig,
    worker: Worker<S>,
    state: Mutex<QueueState<S::Handle>>,
    reports: watch::Sender<Option<BatchReport>>,
}

/// Represents the download queue.
///
/// A queue is created via its builder and is cheap to clone; clones share the
/// same pending queue, workers and flags.
///
/// ```rust
/// # use haul::{QueueBuilder, RemoteSource, ProgressReporter, Result};
/// # use futures::future::BoxFuture;
/// # use std::path::Path;
/// # struct Nothing;
/// # impl RemoteSource for Nothing {
/// #     type Handle = ();
/// #     fn resolve<'a>(&'a self, _: &'a str) -> BoxFuture<'a, Result<()>> { Box::pin(async { Ok(()) }) }
/// #     fn transfer<'a>(&'a self, _: &'a (), _: &'a Path, _: &'a mut ProgressReporter) -> BoxFuture<'a, Result<u64>> { Box::pin(async { Ok(0) }) }
/// # }
/// let queue = QueueBuilder::hidden().concurrency_limit(4).build(Nothing);
/// assert!(queue.is_idle());
/// ```
pub struct DownloadQueue<S: RemoteSource> {
    inner: Arc<Inner<S>>,
}

impl<S: RemoteSource> Clone for DownloadQueue<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: RemoteSource> std::fmt::Debug for DownloadQueue<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadQueue")
            .field("status", &self.status())
            .field("pending", &self.pending_len())
            .field("active", &self.active_len())
            .field("config", &self.inner.config)
            .finish()
    }
}

impl<S: RemoteSource> DownloadQueue<S> {
    /// Create a queue around `source`.
    pub fn new(config: QueueConfig, source: S) -> Self {
        let display = config
            .style_options
            .is_enabled()
            .then(|| Arc::new(ProgressDisplay::new(config.style_options.clone())));
        let emitter = EventEmitter::new(config.on_event.clone(), display);
        let tracker = BatchTracker::new(emitter, config.batch_label.clone(), config.failed_items);
        let worker = Worker {
            source: Arc::new(source),
            control: Arc::new(QueueControl::new()),
            tracker: Arc::new(tracker),
            progress_interval: config.progress_interval,
            poll_interval: config.poll_interval,
        };
        let (reports, _) = watch::channel(None);

        Self {
            inner: Arc::new(Inner {
                config,
                worker,
                state: Mutex::new(QueueState::default()),
                reports,
            }),
        }
    }

    /// Add items to the queue.
    ///
    /// On an idle queue this starts a new batch governed by
    /// `concurrency_limit`. While a batch is running the items join it (the
    /// running batch keeps its limit). Items arriving while a batch is closing
    /// start the next batch right after it.
    ///
    /// File names are made unique against the batch and against files already
    /// present in `destination`.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] when `concurrency_limit` is zero or `destination`
    /// cannot be created. Nothing is queued in that case.
    pub async fn enqueue(
        &self,
        items: Vec<DownloadItem<S::Handle>>,
        concurrency_limit: usize,
        destination: impl AsRef<Path>,
    ) -> Result<()> {
        if concurrency_limit == 0 {
            return Err(Error::Config(
                "concurrency limit must be at least 1".to_string(),
            ));
        }
        if items.is_empty() {
            return Ok(());
        }

        let destination = destination.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&destination)
            .await
            .map_err(|e| {
                Error::Config(format!(
                    "cannot create destination {}: {}",
                    destination.display(),
                    e
                ))
            })?;

        let on_disk = file_names(&destination).await.map_err(|e| {
            Error::Config(format!(
                "cannot read destination {}: {}",
                destination.display(),
                e
            ))
        })?;

        if self.inner.accept(items, concurrency_limit, destination, on_disk) {
            tokio::spawn(self.inner.clone().run());
        }
        self.inner.worker.control.notify();
        Ok(())
    }

    /// Add items with the configured concurrency limit and destination.
    pub async fn submit(&self, items: Vec<DownloadItem<S::Handle>>) -> Result<()> {
        let config = &self.inner.config;
        self.enqueue(items, config.concurrency_limit, config.destination.clone())
            .await
    }

    /// Stop admitting items and hold in-flight transfers.
    pub fn pause(&self) {
        self.inner.worker.control.pause();
    }

    /// Resume after [`pause`](Self::pause).
    pub fn resume(&self) {
        self.inner.worker.control.resume();
    }

    /// Set the pause flag.
    pub fn set_paused(&self, paused: bool) {
        self.inner.worker.control.set_paused(paused);
    }

    /// Cancel the running batch.
    ///
    /// Pending items are discarded, in-flight transfers abort at their next
    /// progress report and a single [`QueueEvent::Aborted`] is emitted once
    /// they are gone.
    pub fn cancel(&self) {
        self.inner.worker.control.cancel();
    }

    /// Whether the queue is paused.
    pub fn is_paused(&self) -> bool {
        self.inner.worker.control.is_paused()
    }

    /// Whether cancellation was requested for the current batch.
    pub fn is_cancelled(&self) -> bool {
        self.inner.worker.control.is_cancelled()
    }

    /// Shared pause/cancel flags, e.g. for a UI thread.
    pub fn control(&self) -> Arc<QueueControl> {
        self.inner.worker.control.clone()
    }

    /// Current phase.
    pub fn status(&self) -> QueueStatus {
        self.inner.lock().phase
    }

    /// Whether no batch is running.
    pub fn is_idle(&self) -> bool {
        self.status() == QueueStatus::Idle
    }

    /// Number of items waiting for a worker.
    pub fn pending_len(&self) -> usize {
        self.inner.lock().pending.len()
    }

    /// Number of items being transferred.
    pub fn active_len(&self) -> usize {
        self.inner.lock().active.len()
    }

    /// Report of the last batch that ended, if any.
    pub fn last_report(&self) -> Option<BatchReport> {
        self.inner.reports.borrow().clone()
    }

    /// Wait until the queue is idle and return the report of the last batch.
    ///
    /// Returns immediately on an idle queue.
    pub async fn wait_idle(&self) -> Option<BatchReport> {
        loop {
            let mut reports = {
                let state = self.inner.lock();
                let reports = self.inner.reports.subscribe();
                if state.phase == QueueStatus::Idle {
                    let report = reports.borrow().clone();
                    return report;
                }
                reports
            };
            if reports.changed().await.is_err() {
                return None;
            }
        }
    }

    /// The configuration the queue was built with.
    pub fn config(&self) -> &QueueConfig {
        &self.inner.config
    }
}

impl<S: RemoteSource> Inner<S> {
    fn lock(&self) -> MutexGuard<'_, QueueState<S::Handle>> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn tracker(&self) -> &BatchTracker {
        &self.worker.tracker
    }

    /// Take items into the queue. Returns `true` when a processor task has to
    /// be spawned.
    fn accept(
        &self,
        items: Vec<DownloadItem<S::Handle>>,
        limit: usize,
        destination: PathBuf,
        on_disk: HashSet<String>,
    ) -> bool {
        let jobs = items
            .into_iter()
            .map(|item| Job {
                item,
                destination: destination.clone(),
            })
            .collect();
        let arrival = Arrival { jobs, on_disk };

        let mut state = self.lock();
        if state.phase == QueueStatus::Running && self.worker.control.is_cancelled() {
            // The loop has not seen the cancellation yet; the batch is over.
            state.phase = QueueStatus::Draining;
        }
        match state.phase {
            QueueStatus::Idle => {
                self.begin_batch(&mut state, limit);
                self.queue_jobs(&mut state, arrival);
                true
            }
            QueueStatus::Running => {
                if limit != state.limit {
                    debug!(
                        requested = limit,
                        running = state.limit,
                        "batch already running, keeping its concurrency limit"
                    );
                }
                self.queue_jobs(&mut state, arrival);
                false
            }
            QueueStatus::Completing | QueueStatus::Draining => {
                state.deferred.push(arrival);
                state.deferred_limit.get_or_insert(limit);
                debug!(
                    deferred = state.deferred.iter().map(|a| a.jobs.len()).sum::<usize>(),
                    "batch closing, items deferred"
                );
                false
            }
        }
    }

    fn begin_batch(&self, state: &mut QueueState<S::Handle>, limit: usize) {
        self.worker.control.reset();
        {
            let mut session = self.tracker().session();
            session.reset();
            session.start(Instant::now());
        }
        state.phase = QueueStatus::Running;
        state.limit = limit;
        state.active.clear();
        state.summaries.clear();
        debug!(limit, "batch started");
    }

    fn queue_jobs(&self, state: &mut QueueState<S::Handle>, arrival: Arrival<S::Handle>) {
        let Arrival { jobs, on_disk } = arrival;
        let mut session = self.tracker().session();
        for Job { item, destination } in jobs {
            let name = unique_name(item.name(), |candidate| {
                session.contains(candidate) || on_disk.contains(candidate)
            });
            let item = if name != item.name() {
                debug!(from = item.name(), to = %name, "renamed to avoid collision");
                item.with_name(name)
            } else {
                item
            };
            session.add(item.name(), item.size());
            state.pending.push_back(Job { item, destination });
        }
        debug!(
            pending = state.pending.len(),
            total = session.total_expected(),
            "items queued"
        );
    }

    /// Pop the head of the queue and mark it active.
    fn admit(&self) -> Option<Job<S::Handle>> {
        let mut state = self.lock();
        let job = state.pending.pop_front()?;
        state.active.insert(job.item.name().to_string());
        Some(job)
    }

    /// Record a worker's result and free its slot.
    fn settle(&self, summary: Summary) {
        let mut state = self.lock();
        state.active.remove(summary.name());
        state.summaries.push(summary);
    }

    async fn run(self: Arc<Self>) {
        loop {
            let limit = self.lock().limit;
            let outcome = self.run_batch(limit).await;
            match outcome {
                BatchOutcome::Finished => {
                    debug!("batch finished");
                    self.tracker().emit(QueueEvent::Finished);
                }
                BatchOutcome::Aborted => {
                    debug!("batch aborted");
                    self.tracker().emit(QueueEvent::Aborted);
                }
            }
            if !self.finish(outcome) {
                break;
            }
        }
    }

    async fn run_batch(self: &Arc<Self>, limit: usize) -> BatchOutcome {
        let control = self.worker.control.clone();
        let poll = self.config.poll_interval;
        let semaphore = Arc::new(Semaphore::new(limit));
        let mut workers = JoinSet::new();

        let outcome = loop {
            let changed = control.notified();
            tokio::pin!(changed);
            changed.as_mut().enable();

            while let Some(joined) = workers.try_join_next() {
                reap(joined);
            }
            if control.is_cancelled() {
                break BatchOutcome::Aborted;
            }

            let has_pending = {
                let mut state = self.lock();
                if state.pending.is_empty() && state.active.is_empty() && workers.is_empty() {
                    state.phase = QueueStatus::Completing;
                    break BatchOutcome::Finished;
                }
                !state.pending.is_empty()
            };

            if control.is_paused() || !has_pending {
                tokio::select! {
                    Some(joined) = workers.join_next() => reap(joined),
                    _ = &mut changed => {}
                    _ = tokio::time::sleep(poll) => {}
                }
                continue;
            }

            let permit = tokio::select! {
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break BatchOutcome::Aborted,
                },
                Some(joined) = workers.join_next() => {
                    reap(joined);
                    continue;
                }
                _ = &mut changed => continue,
            };

            if control.is_cancelled() {
                break BatchOutcome::Aborted;
            }
            if control.is_paused() {
                continue;
            }
            let Some(job) = self.admit() else {
                continue;
            };

            let path = job.destination.join(job.item.name());
            let fallback = Summary::new(&job.item);
            let worker = self.worker.clone();
            let inner = self.clone();
            workers.spawn(async move {
                let started = Instant::now();
                let summary = match AssertUnwindSafe(worker.run(job)).catch_unwind().await {
                    Ok(summary) => summary,
                    Err(_) => {
                        inner
                            .worker
                            .fail_panicked(fallback, &path, started)
                            .await
                    }
                };
                inner.settle(summary);
                drop(permit);
                inner.worker.control.notify();
            });
        };

        if outcome == BatchOutcome::Aborted {
            self.drain(&mut workers).await;
        }
        outcome
    }

    /// Discard pending items and wait for in-flight workers to wind down.
    async fn drain(&self, workers: &mut JoinSet<()>) {
        let discarded: Vec<Summary> = {
            let mut state = self.lock();
            state.phase = QueueStatus::Draining;
            state
                .pending
                .drain(..)
                .map(|job| Summary::new(&job.item).abort())
                .collect()
        };
        debug!(
            discarded = discarded.len(),
            in_flight = workers.len(),
            "draining queue"
        );
        while let Some(joined) = workers.join_next().await {
            reap(joined);
        }
        self.lock().summaries.extend(discarded);
    }

    /// Publish the report of the batch that just ended and either go idle or
    /// start the next batch from deferred items. Returns `true` in the latter
    /// case.
    fn finish(&self, outcome: BatchOutcome) -> bool {
        let mut state = self.lock();
        let snapshot = self.tracker().snapshot();
        self.tracker().session().reset();
        let report = BatchReport {
            outcome,
            summaries: std::mem::take(&mut state.summaries),
            snapshot,
        };
        state.active.clear();
        self.reports.send_replace(Some(report));

        if state.deferred.is_empty() {
            state.phase = QueueStatus::Idle;
            debug!("queue idle");
            return false;
        }

        let arrivals = std::mem::take(&mut state.deferred);
        let limit = state
            .deferred_limit
            .take()
            .unwrap_or(self.config.concurrency_limit);
        self.begin_batch(&mut state, limit);
        for arrival in arrivals {
            self.queue_jobs(&mut state, arrival);
        }
        true
    }
}

/// Names of the entries of `dir`.
async fn file_names(dir: &Path) -> std::io::Result<HashSet<String>> {
    let mut names = HashSet::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if let Ok(name) = entry.file_name().into_string() {
            names.insert(name);
        }
    }
    Ok(names)
}

fn reap(joined: std::result::Result<(), JoinError>) {
    if let Err(e) = joined {
        warn!(error = %e, "worker task failed");
    }
}
