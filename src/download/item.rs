//! The unit of work handed to the queue.

use super::filename::sanitize_filename;

/// A remote object selected for download.
///
/// The handle `H` is whatever the [`RemoteSource`](crate::source::RemoteSource)
/// needs to transfer the object; the queue never looks inside it. Items are
/// immutable once enqueued, so fields are only reachable through getters.
///
/// ```rust
/// use haul::DownloadItem;
///
/// let item = DownloadItem::new("7", "clip:1/2.mp4", "Clip one", 1024, ());
/// assert_eq!(item.name(), "clip_1_2.mp4");
/// assert_eq!(item.size(), 1024);
/// ```
#[derive(Debug, Clone)]
pub struct DownloadItem<H> {
    id: String,
    name: String,
    caption: String,
    size: u64,
    handle: H,
}

impl<H> DownloadItem<H> {
    /// Creates a new [`DownloadItem`], sanitizing `name` into a safe file name.
    pub fn new(
        id: impl Into<String>,
        name: &str,
        caption: impl Into<String>,
        size: u64,
        handle: H,
    ) -> Self {
        let id = id.into();
        let name = sanitize_filename(name, &id);
        Self {
            id,
            name,
            caption: caption.into(),
            size,
            handle,
        }
    }

    /// Opaque identity of the item.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// File name the item is stored under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Display caption.
    pub fn caption(&self) -> &str {
        &self.caption
    }

    /// Expected size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Handle to the remote object.
    pub fn handle(&self) -> &H {
        &self.handle
    }

    /// Replace the file name. Only used before the item is queued, to resolve
    /// collisions.
    pub(crate) fn with_name(self, name: String) -> Self {
        Self { name, ..self }
    }
}
