//! Download items and their results.
//!
//! - [`item`] - the immutable [`DownloadItem`] handed to the queue
//! - [`filename`] - file name sanitation and collision-safe naming
//! - [`summary`] - per-item [`Summary`] and the end-of-batch [`BatchReport`]
//!
//! # Examples
//!
//! ```rust
//! use haul::download::{DownloadItem, Status, Summary};
//!
//! let item = DownloadItem::new("12", "talk.mp4", "Conference talk", 4096, ());
//! let summary = Summary::new(&item).with_transferred(4096).with_status(Status::Done);
//!
//! match summary.status() {
//!     Status::Done => println!("{} done", summary.name()),
//!     Status::Failed(msg) => println!("{} failed: {}", summary.name(), msg),
//!     _ => {}
//! }
//! ```

pub mod filename;
pub mod item;
pub mod summary;

pub use filename::{sanitize_filename, unique_name};
pub use item::DownloadItem;
pub use summary::{BatchOutcome, BatchReport, Status, Summary};
