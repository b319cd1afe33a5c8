//! Notifications emitted by the queue.
//!
//! Every event is stamped with the wall-clock time it was emitted and handed
//! synchronously to each registered callback, in registration order, and to
//! the progress display when one is enabled. Callbacks run on the task that
//! produced the event, so they should be quick: forward into a channel when
//! real work is needed.
//!
//! ```rust
//! use haul::events::QueueEvent;
//! use haul::QueueBuilder;
//!
//! let builder = QueueBuilder::hidden().on_event(|n| match &n.event {
//!     QueueEvent::Started { name } => println!("started {}", name),
//!     QueueEvent::ItemProgress(s) => println!("{} {}% {}", s.name, s.percent, s.speed_str()),
//!     QueueEvent::BatchProgress(s) => println!("{} {}% eta {}", s.label, s.percent, s.eta_str()),
//!     QueueEvent::Finished => println!("all done"),
//!     QueueEvent::Aborted => println!("aborted"),
//! });
//! ```

use crate::progress::{BatchSnapshot, ItemSnapshot, ProgressDisplay};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::trace;

/// What happened.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueEvent {
    /// A worker picked up the item.
    Started {
        /// File name of the item.
        name: String,
    },
    /// Progress of one item, including its terminal `DONE`/`FAILED` snapshot.
    ItemProgress(ItemSnapshot),
    /// Aggregate progress of the running batch.
    BatchProgress(BatchSnapshot),
    /// The batch drained cleanly.
    Finished,
    /// The batch drained through cancellation.
    Aborted,
}

/// A timestamped [`QueueEvent`].
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    /// When the event was emitted.
    pub timestamp: SystemTime,
    /// The event itself.
    pub event: QueueEvent,
}

/// Callback type for queue notifications.
pub type EventCallback = Box<dyn Fn(&Notification) + Send + Sync>;

/// Fans events out to callbacks and the optional display.
#[derive(Clone, Default)]
pub(crate) struct EventEmitter {
    callbacks: Vec<Arc<EventCallback>>,
    display: Option<Arc<ProgressDisplay>>,
}

impl EventEmitter {
    pub(crate) fn new(
        callbacks: Vec<Arc<EventCallback>>,
        display: Option<Arc<ProgressDisplay>>,
    ) -> Self {
        Self { callbacks, display }
    }

    pub(crate) fn emit(&self, event: QueueEvent) {
        trace!(?event, "queue event");
        if let Some(ref display) = self.display {
            display.handle(&event);
        }
        let notification = Notification {
            timestamp: SystemTime::now(),
            event,
        };
        for callback in &self.callbacks {
            callback(&notification);
        }
    }
}
