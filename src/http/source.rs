//! A [`RemoteSource`] over plain HTTP(S).
//!
//! Identifiers are URLs. Resolution asks the server for the size with a HEAD
//! request and falls back to a one-byte range probe when the server does not
//! announce a `Content-Length`. Transfers stream the body chunk by chunk.
//!
//! ```rust,no_run
//! use haul::{HttpSource, QueueBuilder};
//!
//! # async fn example() -> haul::Result<()> {
//! let source = HttpSource::default();
//! let items = vec![
//!     source.item("https://example.com/a.mp4").await?,
//!     source.item("https://example.com/b.mp4").await?,
//! ];
//! let queue = QueueBuilder::new().build(source);
//! queue.enqueue(items, 2, "downloads").await?;
//! queue.wait_idle().await;
//! # Ok(())
//! # }
//! ```

use super::client::{create_http_client, HttpClientConfig};
use crate::download::DownloadItem;
use crate::error::{Error, Result};
use crate::queue::ProgressReporter;
use crate::source::RemoteSource;
use crate::utils::response_size;

use futures::future::BoxFuture;
use futures::StreamExt;
use reqwest::header::{CONTENT_LENGTH, RANGE};
use reqwest::{StatusCode, Url};
use reqwest_middleware::ClientWithMiddleware;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Handle of an HTTP object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpObject {
    /// Where the object lives.
    pub url: Url,
    /// Size announced by the server.
    pub size: Option<u64>,
    /// File name derived from the URL.
    pub filename: String,
}

/// Resolves and streams URLs.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: ClientWithMiddleware,
}

impl Default for HttpSource {
    fn default() -> Self {
        let client = create_http_client(HttpClientConfig::default()).unwrap_or_else(|e| {
            warn!(error = %e, "cannot build the default HTTP client, retries disabled");
            ClientWithMiddleware::from(reqwest::Client::new())
        });
        Self { client }
    }
}

impl HttpSource {
    /// Create a source with its own client.
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        Ok(Self {
            client: create_http_client(config)?,
        })
    }

    /// Create a source sharing an existing client.
    pub fn with_client(client: ClientWithMiddleware) -> Self {
        Self { client }
    }

    /// Resolve a URL into an item ready to be enqueued.
    ///
    /// The URL doubles as the item id; the caption is empty.
    pub async fn item(&self, url: &str) -> Result<DownloadItem<HttpObject>> {
        let object = self.resolve_url(url).await?;
        let filename = object.filename.clone();
        Ok(DownloadItem::new(
            url,
            &filename,
            "",
            object.size.unwrap_or(0),
            object,
        ))
    }

    async fn resolve_url(&self, identifier: &str) -> Result<HttpObject> {
        let url = Url::parse(identifier).map_err(|e| {
            Error::InvalidUrl(format!("The url \"{}\" cannot be parsed: {}", identifier, e))
        })?;
        let filename = filename_from_url(&url)?;

        let res = self.client.head(url.clone()).send().await?;
        if matches!(res.status(), StatusCode::NOT_FOUND | StatusCode::GONE) {
            return Err(Error::NotFound(url.to_string()));
        }
        res.error_for_status_ref()?;

        let mut size = res
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        if size.is_none() {
            debug!(%url, "no content length, probing with a range request");
            let probe = self
                .client
                .get(url.clone())
                .header(RANGE, "bytes=0-0")
                .send()
                .await?;
            if probe.status().is_success() {
                size = response_size(&probe);
            }
        }

        debug!(%url, ?size, filename = %filename, "resolved");
        Ok(HttpObject {
            url,
            size,
            filename,
        })
    }

    async fn stream_to(
        &self,
        object: &HttpObject,
        destination: &Path,
        progress: &mut ProgressReporter,
    ) -> Result<u64> {
        debug!(url = %object.url, "fetching");
        let res = self.client.get(object.url.clone()).send().await?;
        if matches!(res.status(), StatusCode::NOT_FOUND | StatusCode::GONE) {
            return Err(Error::NotFound(object.url.to_string()));
        }
        res.error_for_status_ref()?;

        let total = object
            .size
            .or_else(|| res.content_length())
            .unwrap_or(0);

        if let Some(dir) = destination.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let mut file = tokio::fs::File::create(destination).await?;
        progress.update(0, total).await?;

        let token = progress.token();
        let mut written = 0u64;
        let mut stream = res.bytes_stream();
        loop {
            let item = tokio::select! {
                item = stream.next() => item,
                _ = token.cancelled() => return Err(Error::Aborted),
            };
            let Some(item) = item else {
                break;
            };
            let mut chunk = item?;
            written += chunk.len() as u64;
            file.write_all_buf(&mut chunk).await?;
            progress.update(written, total).await?;
        }
        file.flush().await?;

        if total > 0 && written < total {
            return Err(Error::Transfer(format!(
                "connection closed after {} of {} bytes",
                written, total
            )));
        }
        Ok(written)
    }
}

impl RemoteSource for HttpSource {
    type Handle = HttpObject;

    fn resolve<'a>(&'a self, identifier: &'a str) -> BoxFuture<'a, Result<HttpObject>> {
        Box::pin(self.resolve_url(identifier))
    }

    fn transfer<'a>(
        &'a self,
        handle: &'a HttpObject,
        destination: &'a Path,
        progress: &'a mut ProgressReporter,
    ) -> BoxFuture<'a, Result<u64>> {
        Box::pin(self.stream_to(handle, destination, progress))
    }
}

/// File name from the last path segment of a URL, form-urlencoded decoded.
///
/// ```rust
/// use haul::http::filename_from_url;
/// use reqwest::Url;
///
/// let url = Url::parse("https://example.com/media/my%20talk.mp4").unwrap();
/// assert_eq!(filename_from_url(&url).unwrap(), "my talk.mp4");
/// ```
pub fn filename_from_url(url: &Url) -> Result<String> {
    url.path_segments()
        .ok_or_else(|| {
            Error::InvalidUrl(format!("The url \"{}\" does not contain a valid path", url))
        })?
        .next_back()
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            form_urlencoded::parse(segment.as_bytes())
                .map(|(key, val)| [key, val].concat())
                .collect()
        })
        .ok_or_else(|| {
            Error::InvalidUrl(format!("The url \"{}\" does not contain a filename", url))
        })
}
