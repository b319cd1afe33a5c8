//! The boundary to the remote content source.
//!
//! A [`RemoteSource`] is the authenticated client that knows how to find and
//! move bytes; the queue only schedules it. Implementations report progress by
//! awaiting [`ProgressReporter::update`] at each chunk boundary and returning
//! its error with `?`. That call is where pause blocks and cancellation turns
//! into [`Error::Aborted`](crate::Error::Aborted), so a source that reports
//! regularly gets pause and cancel support for free.
//!
//! ```rust
//! use futures::future::BoxFuture;
//! use haul::{ProgressReporter, RemoteSource, Result};
//! use std::path::Path;
//!
//! /// Pretends to move `n` bytes, one kilobyte at a time.
//! struct Fake;
//!
//! impl RemoteSource for Fake {
//!     type Handle = u64;
//!
//!     fn resolve<'a>(&'a self, identifier: &'a str) -> BoxFuture<'a, Result<u64>> {
//!         Box::pin(async move {
//!             identifier
//!                 .parse()
//!                 .map_err(|_| haul::Error::NotFound(identifier.to_string()))
//!         })
//!     }
//!
//!     fn transfer<'a>(
//!         &'a self,
//!         handle: &'a u64,
//!         _destination: &'a Path,
//!         progress: &'a mut ProgressReporter,
//!     ) -> BoxFuture<'a, Result<u64>> {
//!         Box::pin(async move {
//!             let mut sent = 0;
//!             while sent < *handle {
//!                 sent = (sent + 1024).min(*handle);
//!                 progress.update(sent, *handle).await?;
//!             }
//!             Ok(sent)
//!         })
//!     }
//! }
//! ```

use crate::error::Result;
use crate::queue::ProgressReporter;

use futures::future::BoxFuture;
use std::fmt::Debug;
use std::path::Path;

/// A client able to resolve and transfer remote objects.
pub trait RemoteSource: Send + Sync + 'static {
    /// Opaque reference to a remote object.
    type Handle: Clone + Debug + Send + Sync + 'static;

    /// Look up an object by identifier.
    ///
    /// Fails with [`Error::NotFound`](crate::Error::NotFound) when the source
    /// does not know the identifier.
    fn resolve<'a>(&'a self, identifier: &'a str) -> BoxFuture<'a, Result<Self::Handle>>;

    /// Stream the object to `destination`, returning the number of bytes written.
    ///
    /// Progress must be reported through `progress`; an error returned by
    /// [`ProgressReporter::update`] has to be propagated so that the transfer
    /// stops.
    fn transfer<'a>(
        &'a self,
        handle: &'a Self::Handle,
        destination: &'a Path,
        progress: &'a mut ProgressReporter,
    ) -> BoxFuture<'a, Result<u64>>;
}
