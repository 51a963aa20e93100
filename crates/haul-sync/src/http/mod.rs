//! Remote fetching over HTTP(S).

mod client;

pub use client::{FetcherConfig, HttpFetcher};

use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by a [`Fetcher`].
#[derive(Debug, Error)]
pub enum FetchError {
    /// The remote reported that the resource does not exist.
    #[error("not found: {url}")]
    NotFound { url: String },

    /// Transport-level failure: DNS, connect, TLS, timeout, or a broken
    /// body stream.
    #[error("request failed for {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Any other non-success status code.
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },
}

/// Turns a URL into bytes.
///
/// The sync core does not care which backend serves a manifest or an
/// archive; anything that answers a plain GET works. Implementations other
/// than [`HttpFetcher`] exist mainly so tests can run without a network.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the resource at `url` and return its full body.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}
