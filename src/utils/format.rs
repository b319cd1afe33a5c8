//! Text renderings for progress snapshots.

use std::time::Duration;

/// Bytes per displayed megabyte.
pub const MIB: f64 = 1024.0 * 1024.0;

/// Render a throughput as `"12.34 MB/s"`.
pub fn format_speed(bytes_per_sec: f64) -> String {
    format!("{:.2} MB/s", bytes_per_sec.max(0.0) / MIB)
}

/// Render a single item's transferred/expected bytes as `"1.5/10.0 MB"`.
pub fn format_item_size(current: u64, total: u64) -> String {
    format!("{:.1}/{:.1} MB", current as f64 / MIB, total as f64 / MIB)
}

/// Render the batch transferred/expected bytes as `"1.5 / 10.0 MB"`.
pub fn format_batch_size(current: u64, total: u64) -> String {
    format!("{:.1} / {:.1} MB", current as f64 / MIB, total as f64 / MIB)
}

/// Render a duration as `MM:SS`.
///
/// Minutes do not wrap at the hour.
pub fn format_clock_ms(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Render a duration as `HH:MM:SS`.
///
/// Hours do not wrap at the day.
pub fn format_clock_hms(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    )
}
