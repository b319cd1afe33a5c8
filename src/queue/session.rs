//! Batch statistics.
//!
//! A batch lasts from the first enqueue on an idle queue until the queue next
//! drains. Its [`BatchSession`] holds the expected total, one byte counter per
//! item name and the start time. Snapshots are derived from those counters on
//! demand.

use super::config::FailedItemPolicy;
use crate::events::{EventEmitter, QueueEvent};
use crate::progress::{batch_snapshot, BatchSnapshot};

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

#[derive(Debug, Clone, Copy)]
struct Counter {
    size: u64,
    bytes: u64,
    failed: bool,
}

/// Mutable aggregate state of the running batch.
#[derive(Debug, Default)]
pub struct BatchSession {
    total_expected: u64,
    counters: HashMap<String, Counter>,
    started: Option<Instant>,
    /// Highest batch percent emitted so far.
    high_water: u8,
}

impl BatchSession {
    /// Stamp the start time of the batch.
    pub fn start(&mut self, now: Instant) {
        self.started = Some(now);
    }

    /// When the batch started, if it has.
    pub fn started(&self) -> Option<Instant> {
        self.started
    }

    /// Whether the session tracks no items.
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// Whether an item with this name belongs to the batch.
    pub fn contains(&self, name: &str) -> bool {
        self.counters.contains_key(name)
    }

    /// Register an item and grow the expected total.
    pub fn add(&mut self, name: &str, size: u64) {
        let counter = Counter {
            size,
            bytes: 0,
            failed: false,
        };
        if let Some(old) = self.counters.insert(name.to_string(), counter) {
            self.total_expected -= old.size;
        }
        self.total_expected += size;
    }

    /// Change the expected size of an item, e.g. once a source learns it.
    pub fn resize(&mut self, name: &str, size: u64) {
        if let Some(counter) = self.counters.get_mut(name) {
            self.total_expected = self.total_expected - counter.size + size;
            counter.size = size;
            counter.bytes = counter.bytes.min(size);
        }
    }

    /// Record bytes transferred for an item.
    ///
    /// Counters never move backwards and never exceed the item size. Returns
    /// the stored value.
    pub fn record(&mut self, name: &str, bytes: u64) -> u64 {
        match self.counters.get_mut(name) {
            Some(counter) => {
                counter.bytes = counter.bytes.max(bytes.min(counter.size));
                counter.bytes
            }
            None => 0,
        }
    }

    /// Mark an item complete.
    pub fn complete(&mut self, name: &str) {
        if let Some(counter) = self.counters.get_mut(name) {
            counter.bytes = counter.size;
        }
    }

    /// Mark an item failed.
    pub fn fail(&mut self, name: &str) {
        if let Some(counter) = self.counters.get_mut(name) {
            counter.failed = true;
        }
    }

    /// Bytes transferred and expected size of one item.
    pub fn progress(&self, name: &str) -> Option<(u64, u64)> {
        self.counters.get(name).map(|c| (c.bytes, c.size))
    }

    /// Sum of the expected sizes of every item ever added.
    pub fn total_expected(&self) -> u64 {
        self.total_expected
    }

    /// Sum of all byte counters.
    pub fn bytes_so_far(&self) -> u64 {
        self.counters.values().map(|c| c.bytes).sum()
    }

    /// Current and total bytes under the given failed-item policy.
    pub fn totals(&self, policy: FailedItemPolicy) -> (u64, u64) {
        match policy {
            FailedItemPolicy::Count => (self.bytes_so_far(), self.total_expected),
            FailedItemPolicy::Exclude => self
                .counters
                .values()
                .filter(|c| !c.failed)
                .fold((0, 0), |(current, total), c| {
                    (current + c.bytes, total + c.size)
                }),
        }
    }

    /// Aggregate snapshot at `now`.
    ///
    /// The percentage is held at its previous high-water mark when the total
    /// grew faster than the transferred bytes.
    pub fn snapshot(
        &mut self,
        label: &str,
        policy: FailedItemPolicy,
        now: Instant,
    ) -> BatchSnapshot {
        let (current, total) = self.totals(policy);
        let elapsed = self
            .started
            .map(|started| now.saturating_duration_since(started))
            .unwrap_or_default();
        let mut snapshot = batch_snapshot(label, current, total, elapsed);
        snapshot.percent = snapshot.percent.max(self.high_water).min(100);
        self.high_water = snapshot.percent;
        snapshot
    }

    /// Forget everything.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// The session plus what is needed to publish its progress.
///
/// Shared by the processor and every worker of a queue.
pub(crate) struct BatchTracker {
    session: Mutex<BatchSession>,
    /// Serializes batch snapshots with their emission so that observers see
    /// percentages in the order they were computed.
    publishing: Mutex<()>,
    emitter: EventEmitter,
    label: String,
    policy: FailedItemPolicy,
}

impl BatchTracker {
    pub(crate) fn new(emitter: EventEmitter, label: String, policy: FailedItemPolicy) -> Self {
        Self {
            session: Mutex::new(BatchSession::default()),
            publishing: Mutex::new(()),
            emitter,
            label,
            policy,
        }
    }

    pub(crate) fn session(&self) -> MutexGuard<'_, BatchSession> {
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn emit(&self, event: QueueEvent) {
        self.emitter.emit(event);
    }

    pub(crate) fn record(&self, name: &str, bytes: u64) -> u64 {
        self.session().record(name, bytes)
    }

    pub(crate) fn resize(&self, name: &str, size: u64) {
        self.session().resize(name, size);
    }

    pub(crate) fn complete(&self, name: &str) {
        self.session().complete(name);
    }

    pub(crate) fn fail(&self, name: &str) {
        self.session().fail(name);
    }

    pub(crate) fn progress(&self, name: &str) -> Option<(u64, u64)> {
        self.session().progress(name)
    }

    pub(crate) fn snapshot(&self) -> BatchSnapshot {
        self.session()
            .snapshot(&self.label, self.policy, Instant::now())
    }

    /// Emit the current aggregate.
    pub(crate) fn publish(&self) {
        let _publishing = self
            .publishing
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let snapshot = self.snapshot();
        self.emit(QueueEvent::BatchProgress(snapshot));
    }
}
