//! HTTP transport.
//!
//! - [`client`] - reqwest client creation with retry and tracing middleware
//! - [`source`] - [`HttpSource`], a [`RemoteSource`](crate::RemoteSource) for URLs

pub mod client;
pub mod source;

pub use client::{create_http_client, HttpClientConfig};
pub use source::{filename_from_url, HttpObject, HttpSource};
