//! Terminal rendering of queue events with indicatif.

use crate::events::QueueEvent;
use crate::progress::{ItemSnapshot, ItemState, StyleOptions};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Progress display driven by [`QueueEvent`]s.
///
/// The batch bar is created lazily for each batch and finished when the batch
/// ends; child bars live from `Started` until the item's terminal snapshot.
pub struct ProgressDisplay {
    multi: MultiProgress,
    bars: Mutex<Bars>,
    style_options: StyleOptions,
}

#[derive(Default)]
struct Bars {
    main: Option<ProgressBar>,
    children: HashMap<String, ProgressBar>,
}

impl ProgressDisplay {
    /// Create a new progress display.
    pub fn new(style_options: StyleOptions) -> Self {
        let multi = match style_options.is_enabled() {
            true => MultiProgress::new(),
            false => MultiProgress::with_draw_target(ProgressDrawTarget::hidden()),
        };
        Self {
            multi,
            bars: Mutex::new(Bars::default()),
            style_options,
        }
    }

    /// Render one event.
    pub fn handle(&self, event: &QueueEvent) {
        let mut bars = self.bars();
        match event {
            QueueEvent::Started { name } => {
                let pb = self
                    .multi
                    .add(self.style_options.child().clone().to_progress_bar(0));
                pb.set_message(name.clone());
                bars.children.insert(name.clone(), pb);
            }
            QueueEvent::ItemProgress(snapshot) => {
                let Some(pb) = bars.children.get(&snapshot.name) else {
                    return;
                };
                pb.set_length(snapshot.total);
                pb.set_position(snapshot.current);
                pb.set_message(item_message(snapshot));
                if snapshot.state != ItemState::Running {
                    if let Some(pb) = bars.children.remove(&snapshot.name) {
                        self.finish_bar(&pb, self.style_options.child().clear);
                    }
                }
            }
            QueueEvent::BatchProgress(snapshot) => {
                let main = bars.main.get_or_insert_with(|| {
                    let pb = self
                        .multi
                        .insert(0, self.style_options.main().clone().to_progress_bar(0));
                    pb.set_prefix(snapshot.label.clone());
                    pb
                });
                main.set_length(snapshot.total);
                main.set_position(snapshot.current);
                main.set_message(format!(
                    "{} {} eta {}",
                    snapshot.size_str(),
                    snapshot.speed_str(),
                    snapshot.eta_str()
                ));
            }
            QueueEvent::Finished | QueueEvent::Aborted => {
                for (_, pb) in bars.children.drain() {
                    pb.abandon();
                }
                if let Some(main) = bars.main.take() {
                    if matches!(event, QueueEvent::Aborted) {
                        main.abandon_with_message("aborted");
                    } else {
                        self.finish_bar(&main, self.style_options.main().clear);
                    }
                }
            }
        }
    }

    fn finish_bar(&self, pb: &ProgressBar, clear: bool) {
        if clear {
            pb.finish_and_clear();
        } else {
            pb.finish();
        }
    }

    fn bars(&self) -> MutexGuard<'_, Bars> {
        self.bars.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn item_message(snapshot: &ItemSnapshot) -> String {
    format!(
        "{} {} {} eta {}",
        snapshot.name,
        snapshot.size_str(),
        snapshot.speed_str(),
        snapshot.eta_str()
    )
}
