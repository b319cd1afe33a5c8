use futures::future::BoxFuture;
use haul::events::{Notification, QueueEvent};
use haul::progress::{ProgressBarOpts, StyleOptions};
use haul::{
    BatchReport, BatchSnapshot, DownloadItem, DownloadQueue, Error, ItemSnapshot,
    ProgressReporter, QueueBuilder, RemoteSource, Result,
};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub const MB: u64 = 1024 * 1024;

/// Upper bound for any batch in these tests.
pub const BATCH_TIMEOUT: Duration = Duration::from_secs(20);

/// Installs a tracing subscriber honoring `RUST_LOG`, once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Creates a temporary directory for testing purposes
pub fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temporary directory")
}

/// Creates a temporary file with the given content
pub fn create_temp_file(dir: &Path, filename: &str, content: &[u8]) -> PathBuf {
    let file_path = dir.join(filename);
    fs::write(&file_path, content).expect("Failed to write temporary file");
    file_path
}

/// Names of the files in a directory, sorted.
pub fn list_dir(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("Failed to read directory")
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

// === Scripted source ===

/// What a [`MockSource`] transfer does.
#[derive(Debug, Clone)]
pub struct MockObject {
    pub size: u64,
    pub chunk: u64,
    pub delay: Duration,
    /// Fail with a transfer error once this many bytes went through.
    pub fail_after: Option<u64>,
    /// Panic once this many bytes went through.
    pub panic_after: Option<u64>,
    /// Ignore the abort error of a progress report and return `Ok`.
    pub swallow_abort: bool,
}

impl MockObject {
    /// `size` bytes in ten chunks, one millisecond apart.
    pub fn new(size: u64) -> Self {
        Self {
            size,
            chunk: (size / 10).max(1),
            delay: Duration::from_millis(1),
            fail_after: None,
            panic_after: None,
            swallow_abort: false,
        }
    }

    pub fn chunks(mut self, chunks: u64) -> Self {
        self.chunk = (self.size / chunks.max(1)).max(1);
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn fail_after(mut self, bytes: u64) -> Self {
        self.fail_after = Some(bytes);
        self
    }

    pub fn panic_after(mut self, bytes: u64) -> Self {
        self.panic_after = Some(bytes);
        self
    }

    pub fn swallow_abort(mut self) -> Self {
        self.swallow_abort = true;
        self
    }
}

/// Transfer boundary recorded by a [`Probe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trace {
    Begin(String),
    End(String),
}

/// Observes what a [`MockSource`] is doing.
#[derive(Debug, Default)]
pub struct Probe {
    active: AtomicUsize,
    max_active: AtomicUsize,
    trace: Mutex<Vec<Trace>>,
}

impl Probe {
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn trace(&self) -> Vec<Trace> {
        self.trace.lock().unwrap().clone()
    }

    /// Names of the transfers that began, in order.
    pub fn begun(&self) -> Vec<String> {
        self.trace()
            .into_iter()
            .filter_map(|t| match t {
                Trace::Begin(name) => Some(name),
                Trace::End(_) => None,
            })
            .collect()
    }

    fn enter(self: &Arc<Self>, name: &str) -> ActiveGuard {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        self.trace.lock().unwrap().push(Trace::Begin(name.to_string()));
        ActiveGuard {
            probe: self.clone(),
            name: name.to_string(),
        }
    }
}

struct ActiveGuard {
    probe: Arc<Probe>,
    name: String,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.probe.active.fetch_sub(1, Ordering::SeqCst);
        if let Ok(mut trace) = self.probe.trace.lock() {
            trace.push(Trace::End(self.name.clone()));
        }
    }
}

/// In-memory [`RemoteSource`]: creates empty files and reports scripted
/// progress.
#[derive(Debug, Default)]
pub struct MockSource {
    registry: HashMap<String, MockObject>,
    pub probe: Arc<Probe>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, identifier: &str, object: MockObject) -> Self {
        self.registry.insert(identifier.to_string(), object);
        self
    }

    async fn run(
        &self,
        object: &MockObject,
        destination: &Path,
        progress: &mut ProgressReporter,
    ) -> Result<u64> {
        let name = destination
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let _guard = self.probe.enter(&name);
        tokio::fs::write(destination, b"").await?;

        let mut sent = 0;
        if let Err(e) = progress.update(0, object.size).await {
            return self.on_error(e, sent, object);
        }
        while sent < object.size {
            tokio::time::sleep(object.delay).await;
            sent = (sent + object.chunk).min(object.size);
            if object.panic_after.is_some_and(|limit| sent >= limit) {
                panic!("scripted panic in {}", name);
            }
            if object.fail_after.is_some_and(|limit| sent >= limit) {
                return Err(Error::Transfer("connection reset".into()));
            }
            if let Err(e) = progress.update(sent, object.size).await {
                return self.on_error(e, sent, object);
            }
        }
        Ok(sent)
    }

    fn on_error(&self, e: Error, sent: u64, object: &MockObject) -> Result<u64> {
        match object.swallow_abort {
            true => Ok(sent),
            false => Err(e),
        }
    }
}

impl RemoteSource for MockSource {
    type Handle = MockObject;

    fn resolve<'a>(&'a self, identifier: &'a str) -> BoxFuture<'a, Result<MockObject>> {
        Box::pin(async move {
            self.registry
                .get(identifier)
                .cloned()
                .ok_or_else(|| Error::NotFound(identifier.to_string()))
        })
    }

    fn transfer<'a>(
        &'a self,
        handle: &'a MockObject,
        destination: &'a Path,
        progress: &'a mut ProgressReporter,
    ) -> BoxFuture<'a, Result<u64>> {
        Box::pin(self.run(handle, destination, progress))
    }
}

/// An item whose expected size matches its scripted object.
pub fn mock_item(name: &str, object: MockObject) -> DownloadItem<MockObject> {
    DownloadItem::new(name, name, format!("caption of {}", name), object.size, object)
}

/// Items `item-0.bin`, `item-1.bin`, ... of the same shape.
pub fn mock_items(count: usize, object: MockObject) -> Vec<DownloadItem<MockObject>> {
    (0..count)
        .map(|i| mock_item(&format!("item-{}.bin", i), object.clone()))
        .collect()
}

// === Event recording ===

/// Collects every event a queue emits.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<QueueEvent>>>,
}

impl EventLog {
    pub fn callback(&self) -> impl Fn(&Notification) + Send + Sync + 'static {
        let events = self.events.clone();
        move |n: &Notification| events.lock().unwrap().push(n.event.clone())
    }

    pub fn events(&self) -> Vec<QueueEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn batch(&self) -> Vec<BatchSnapshot> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                QueueEvent::BatchProgress(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn batch_percents(&self) -> Vec<u8> {
        self.batch().into_iter().map(|s| s.percent).collect()
    }

    pub fn items(&self, name: &str) -> Vec<ItemSnapshot> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                QueueEvent::ItemProgress(s) if s.name == name => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&QueueEvent) -> bool) -> usize {
        self.events().iter().filter(|e| pred(e)).count()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }
}

// === Queue helpers ===

/// Hidden bars, fast polling and unthrottled progress.
pub fn test_builder() -> QueueBuilder {
    QueueBuilder::hidden()
        .poll_interval(Duration::from_millis(5))
        .progress_interval(Duration::ZERO)
}

/// A queue recording into a fresh [`EventLog`].
pub fn recorded_queue(
    builder: QueueBuilder,
    source: MockSource,
) -> (DownloadQueue<MockSource>, EventLog, Arc<Probe>) {
    let log = EventLog::default();
    let probe = source.probe.clone();
    let queue = builder.on_event(log.callback()).build(source);
    (queue, log, probe)
}

/// Waits for the queue to go idle and returns the last report.
pub async fn settle(queue: &DownloadQueue<MockSource>) -> BatchReport {
    tokio::time::timeout(BATCH_TIMEOUT, queue.wait_idle())
        .await
        .expect("queue did not drain in time")
        .expect("no batch report")
}

// === Progress bar helpers ===

/// Creates disabled style options for testing
pub fn create_disabled_style_options() -> StyleOptions {
    StyleOptions::new(ProgressBarOpts::hidden(), ProgressBarOpts::hidden())
}

/// Asserts that progress bar options are disabled
pub fn assert_progress_opts_disabled(opts: &ProgressBarOpts) {
    let pb = opts.clone().to_progress_bar(100);
    assert!(pb.is_hidden(), "Progress bar should be disabled");
}

// === Local HTTP server ===

/// Creates test file content of specified size
pub fn create_test_content(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 256) as u8).collect()
}

pub const TALK_SIZE: usize = 64 * 1024;
pub const UNSIZED_SIZE: usize = 4096;

/// Serves a handful of fixed media routes over plain HTTP/1.1 and returns
/// the base URL.
///
/// - `/media/talk.mp4`: sized object
/// - `/media/unsized.bin`: no `Content-Length` on HEAD, answers range probes
/// - `/media/short.bin`: announces more bytes than it sends
/// - anything else: 404
pub async fn spawn_media_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test server");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let _ = respond(stream).await;
            });
        }
    });
    format!("http://{}", addr)
}

async fn respond(mut stream: tokio::net::TcpStream) -> std::io::Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        request.extend_from_slice(&buf[..n]);
    }
    let request = String::from_utf8_lossy(&request).to_ascii_lowercase();
    let mut first = request.lines().next().unwrap_or_default().split_whitespace();
    let method = first.next().unwrap_or_default().to_string();
    let path = first.next().unwrap_or_default().to_string();
    let ranged = request.contains("\r\nrange:");

    let (head, body) = match (path.as_str(), method.as_str(), ranged) {
        ("/media/talk.mp4", _, _) => (
            format!("HTTP/1.1 200 OK\r\nContent-Length: {}\r\n", TALK_SIZE),
            create_test_content(TALK_SIZE),
        ),
        ("/media/unsized.bin", "head", _) => ("HTTP/1.1 200 OK\r\n".to_string(), Vec::new()),
        ("/media/unsized.bin", _, true) => (
            format!(
                "HTTP/1.1 206 Partial Content\r\nContent-Range: bytes 0-0/{}\r\nContent-Length: 1\r\n",
                UNSIZED_SIZE
            ),
            vec![0],
        ),
        ("/media/unsized.bin", _, false) => (
            "HTTP/1.1 200 OK\r\n".to_string(),
            create_test_content(UNSIZED_SIZE),
        ),
        ("/media/short.bin", _, _) => (
            "HTTP/1.1 200 OK\r\nContent-Length: 8192\r\n".to_string(),
            create_test_content(100),
        ),
        _ => (
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n".to_string(),
            Vec::new(),
        ),
    };

    stream
        .write_all(format!("{}Connection: close\r\n\r\n", head).as_bytes())
        .await?;
    if method != "head" {
        stream.write_all(&body).await?;
    }
    stream.shutdown().await
}

/// An [`HttpSource`](haul::HttpSource) that ignores system proxies.
pub fn local_http_source() -> haul::HttpSource {
    let client = reqwest::Client::builder()
        .no_proxy()
        .build()
        .expect("Failed to build client");
    haul::HttpSource::with_client(reqwest_middleware::ClientWithMiddleware::from(client))
}
