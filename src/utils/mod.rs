//! Shared utility functions.
//!
//! - [`format`] - human readable speed, size and clock renderings used by
//!   progress snapshots
//! - [`content_length`] - size discovery from HTTP responses
//!
//! # Examples
//!
//! ```rust
//! use haul::utils::{format_clock_hms, format_speed};
//! use std::time::Duration;
//!
//! assert_eq!(format_speed(3.0 * 1024.0 * 1024.0), "3.00 MB/s");
//! assert_eq!(format_clock_hms(Duration::from_secs(3725)), "01:02:05");
//! ```

pub mod content_length;
pub mod format;

pub use content_length::{parse_content_range_total, response_size};
pub use format::{
    format_batch_size, format_clock_hms, format_clock_ms, format_item_size, format_speed, MIB,
};
