//! Download a few URLs through the queue, pausing and resuming on the way.
//!
//! ```text
//! RUST_LOG=haul=debug cargo run --example fetch -- https://example.com/a.mp4 ...
//! ```

use color_eyre::{eyre::eyre, Result};
use haul::{HttpSource, QueueBuilder, Status};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let urls: Vec<String> = std::env::args().skip(1).collect();
    if urls.is_empty() {
        return Err(eyre!("usage: fetch <url>..."));
    }

    let source = HttpSource::default();
    let mut items = Vec::with_capacity(urls.len());
    for url in &urls {
        items.push(source.item(url).await?);
    }

    let queue = QueueBuilder::new().destination("downloads").build(source);
    queue.submit(items).await?;

    // Show that in-flight transfers hold still while paused.
    tokio::time::sleep(Duration::from_secs(2)).await;
    queue.pause();
    tokio::time::sleep(Duration::from_secs(1)).await;
    queue.resume();

    let report = queue
        .wait_idle()
        .await
        .ok_or_else(|| eyre!("no batch ran"))?;

    println!();
    for summary in &report.summaries {
        match summary.status() {
            Status::Done => println!("✓ {} ({} bytes)", summary.name(), summary.transferred()),
            Status::Failed(msg) => println!("✗ {}: {}", summary.name(), msg),
            other => println!("? {}: {:?}", summary.name(), other),
        }
    }
    println!(
        "{} {}% {} in total",
        report.snapshot.label,
        report.snapshot.percent,
        report.snapshot.size_str()
    );

    Ok(())
}
