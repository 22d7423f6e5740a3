//! Image download functionality.
//!
//! Fetches the raw bytes of a source image over HTTP/HTTPS. One attempt per
//! request, bounded by the client timeout and a maximum body size.

use bytes::{Bytes, BytesMut};
use std::time::Duration;
use thiserror::Error;

/// Download errors
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("HTTP error {status} from {url}")]
    HttpError { url: String, status: u16 },

    #[error("Image at {url} exceeds {limit} bytes")]
    TooLarge { url: String, limit: u64 },
}

impl FetchError {
    fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else {
            FetchError::Request {
                url: url.to_string(),
                source,
            }
        }
    }
}

/// Shared HTTP client for all downloads
///
/// Built once by the composition root and cloned into each request;
/// `reqwest::Client` is reference counted, so clones share one pool.
#[derive(Debug, Clone)]
pub struct ImageFetcher {
    client: reqwest::Client,
    max_bytes: u64,
}

impl ImageFetcher {
    /// Create a fetcher with a total request timeout and body size limit
    pub fn new(timeout: Duration, max_bytes: u64) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(FetchError::ClientBuild)?;

        Ok(Self { client, max_bytes })
    }

    /// Download the body at `url`
    ///
    /// Fails on transport errors, a non-success status, or a body larger
    /// than the configured limit.
    pub async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        tracing::info!("Downloading image from: {}", url);

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpError {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if let Some(len) = response.content_length() {
            if len > self.max_bytes {
                return Err(self.too_large(url));
            }
        }

        let mut buf = BytesMut::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?
        {
            if (buf.len() + chunk.len()) as u64 > self.max_bytes {
                return Err(self.too_large(url));
            }
            buf.extend_from_slice(&chunk);
        }

        tracing::debug!("Downloaded {} bytes from {}", buf.len(), url);
        Ok(buf.freeze())
    }

    fn too_large(&self, url: &str) -> FetchError {
        FetchError::TooLarge {
            url: url.to_string(),
            limit: self.max_bytes,
        }
    }
}
