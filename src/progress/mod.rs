//! Progress computation and rendering.
//!
//! - [`aggregate`] - pure per-item and batch snapshot math
//! - [`throttle`] - emission rate limiting for worker progress samples
//! - `style` - progress bar styling options
//! - `display` - indicatif rendering of queue events
//!
//! # Examples
//!
//! ```rust
//! use haul::progress::{batch_snapshot, item_snapshot};
//! use std::time::Duration;
//!
//! let mb = 1024 * 1024;
//! let item = item_snapshot("talk.mp4", 5 * mb, 10 * mb, Duration::from_secs(5));
//! assert_eq!(item.percent, 50);
//! assert_eq!(item.speed_str(), "1.00 MB/s");
//!
//! let batch = batch_snapshot("BATCH", 5 * mb, 20 * mb, Duration::from_secs(5));
//! assert_eq!(batch.percent, 25);
//! assert_eq!(batch.eta_str(), "00:00:15");
//! ```

pub mod aggregate;
pub(crate) mod display;
pub(crate) mod style;
pub mod throttle;

pub use aggregate::{batch_snapshot, item_snapshot, BatchSnapshot, ItemSnapshot, ItemState};
pub use display::ProgressDisplay;
pub use style::{ProgressBarOpts, StyleOptions};
pub use throttle::Throttle;
