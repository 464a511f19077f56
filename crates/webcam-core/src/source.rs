//! Remote image sources.
//!
//! [`ImageSource`] abstracts over the real HTTP endpoint and the scripted
//! [`MockSource`](crate::MockSource) used in tests.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use tracing::debug;

use crate::error::{Error, Result};

/// Default request timeout for [`HttpSource`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Something that can be asked for the latest snapshot.
///
/// # Example
///
/// ```ignore
/// use webcam_core::{ImageSource, Result};
///
/// async fn snapshot_len<S: ImageSource>(source: &S) -> Result<usize> {
///     Ok(source.fetch().await?.len())
/// }
/// ```
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Download the current snapshot.
    ///
    /// A non-success status is an error, never an empty payload.
    async fn fetch(&self) -> Result<Bytes>;

    /// Human-readable identity of the source, used in log lines.
    fn describe(&self) -> &str;
}

/// Snapshot source backed by a single fixed URL.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    url: String,
}

impl HttpSource {
    /// Create a source for `url` with the given request timeout.
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| Error::Transport {
                url: url.to_string(),
                source,
            })?;
        Self::with_client(url, client)
    }

    /// Create a source with a custom reqwest Client.
    pub fn with_client(url: &str, client: Client) -> Result<Self> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(Error::InvalidConfig(format!(
                "URL must start with http:// or https://, got: {url}"
            )));
        }

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    /// The URL being fetched.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ImageSource for HttpSource {
    async fn fetch(&self) -> Result<Bytes> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|source| Error::Transport {
                url: self.url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|source| Error::Transport {
            url: self.url.clone(),
            source,
        })?;
        debug!("Fetched {} bytes from {}", body.len(), self.url);
        Ok(body)
    }

    fn describe(&self) -> &str {
        &self.url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_creation() {
        let source = HttpSource::new("https://cam.example.org/latest.php", DEFAULT_TIMEOUT);
        assert!(source.is_ok());

        let source = source.unwrap();
        assert_eq!(source.url(), "https://cam.example.org/latest.php");
        assert_eq!(source.describe(), "https://cam.example.org/latest.php");
    }

    #[test]
    fn test_source_rejects_non_http_urls() {
        for bad in ["cam.example.org/latest.php", "ftp://cam.example.org/x.jpg", ""] {
            let result = HttpSource::new(bad, DEFAULT_TIMEOUT);
            assert!(matches!(result, Err(Error::InvalidConfig(_))), "{bad}");
        }
    }

    #[tokio::test]
    async fn test_unreachable_source_is_transport_error() {
        // Port 9 (discard) on localhost is almost never listening.
        let source = HttpSource::new("http://127.0.0.1:9/latest.jpg", Duration::from_secs(2))
            .unwrap();
        let result = source.fetch().await;
        assert!(matches!(result, Err(Error::Transport { .. })));
    }
}
