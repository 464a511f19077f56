//! Mock source and clock for testing.
//!
//! [`MockSource`] implements [`ImageSource`] with a scripted sequence of
//! responses, so verification and scheduling can be exercised without a
//! network. [`FixedClock`] pins "now" to a chosen instant.
//!
//! # Example
//!
//! ```
//! use webcam_core::{ImageSource, MockSource};
//!
//! #[tokio::main]
//! async fn main() {
//!     let source = MockSource::builder()
//!         .respond(&b"partial"[..])
//!         .fallback(&b"complete"[..])
//!         .build();
//!
//!     assert_eq!(&source.fetch().await.unwrap()[..], b"partial");
//!     assert_eq!(&source.fetch().await.unwrap()[..], b"complete");
//!     assert_eq!(source.fetch_count(), 2);
//! }
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::source::ImageSource;

const MOCK_URL: &str = "mock://webcam";

/// One scripted answer of a [`MockSource`].
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// A successful response with this body.
    Body(Bytes),
    /// A response with this (non-success) HTTP status.
    Status(u16),
}

impl MockResponse {
    fn into_result(self) -> Result<Bytes> {
        match self {
            MockResponse::Body(bytes) => Ok(bytes),
            MockResponse::Status(status) => Err(Error::HttpStatus {
                url: MOCK_URL.to_string(),
                status,
            }),
        }
    }
}

/// A scripted snapshot source.
///
/// Queued responses are consumed first; afterwards every fetch returns the
/// fallback response (HTTP 503 if none was configured).
pub struct MockSource {
    queue: Mutex<VecDeque<MockResponse>>,
    fallback: MockResponse,
    fetch_count: AtomicU32,
    should_fail: AtomicBool,
}

impl std::fmt::Debug for MockSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSource")
            .field("fallback", &self.fallback)
            .field("fetch_count", &self.fetch_count.load(Ordering::Relaxed))
            .field("should_fail", &self.should_fail.load(Ordering::Relaxed))
            .finish()
    }
}

impl MockSource {
    /// A source that always returns the same body.
    pub fn constant(body: impl Into<Bytes>) -> Self {
        Self::builder().fallback(body).build()
    }

    /// Start building a scripted source.
    pub fn builder() -> MockSourceBuilder {
        MockSourceBuilder::default()
    }

    /// Number of fetches performed so far.
    pub fn fetch_count(&self) -> u32 {
        self.fetch_count.load(Ordering::SeqCst)
    }

    /// Make every subsequent fetch fail with HTTP 500, ignoring the script.
    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }

    /// Append a response to the script.
    pub async fn push(&self, response: MockResponse) {
        self.queue.lock().await.push_back(response);
    }
}

#[async_trait]
impl ImageSource for MockSource {
    async fn fetch(&self) -> Result<Bytes> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);

        if self.should_fail.load(Ordering::SeqCst) {
            return MockResponse::Status(500).into_result();
        }

        let next = self.queue.lock().await.pop_front();
        next.unwrap_or_else(|| self.fallback.clone()).into_result()
    }

    fn describe(&self) -> &str {
        MOCK_URL
    }
}

/// Builder for [`MockSource`].
#[derive(Debug)]
pub struct MockSourceBuilder {
    queue: VecDeque<MockResponse>,
    fallback: MockResponse,
}

impl Default for MockSourceBuilder {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
            fallback: MockResponse::Status(503),
        }
    }
}

impl MockSourceBuilder {
    /// Queue a successful response.
    #[must_use]
    pub fn respond(mut self, body: impl Into<Bytes>) -> Self {
        self.queue.push_back(MockResponse::Body(body.into()));
        self
    }

    /// Queue an error status response.
    #[must_use]
    pub fn respond_status(mut self, status: u16) -> Self {
        self.queue.push_back(MockResponse::Status(status));
        self
    }

    /// Body returned once the queue is exhausted.
    #[must_use]
    pub fn fallback(mut self, body: impl Into<Bytes>) -> Self {
        self.fallback = MockResponse::Body(body.into());
        self
    }

    /// Build the source.
    pub fn build(self) -> MockSource {
        MockSource {
            queue: Mutex::new(self.queue),
            fallback: self.fallback,
            fetch_count: AtomicU32::new(0),
            should_fail: AtomicBool::new(false),
        }
    }
}

/// A clock frozen at a settable instant.
#[derive(Debug)]
pub struct FixedClock {
    millis: AtomicI64,
}

impl FixedClock {
    /// Create a clock reading `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            millis: AtomicI64::new(now.timestamp_millis()),
        }
    }

    /// Move the clock to `now`.
    pub fn set(&self, now: DateTime<Utc>) {
        self.millis.store(now.timestamp_millis(), Ordering::SeqCst);
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let delta = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.millis.fetch_add(delta, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst)).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_constant_source() {
        let source = MockSource::constant(vec![7u8; 16]);
        for _ in 0..3 {
            assert_eq!(source.fetch().await.unwrap().len(), 16);
        }
        assert_eq!(source.fetch_count(), 3);
    }

    #[tokio::test]
    async fn test_script_then_fallback() {
        let source = MockSource::builder()
            .respond_status(404)
            .respond(&b"a"[..])
            .build();

        assert!(matches!(
            source.fetch().await,
            Err(Error::HttpStatus { status: 404, .. })
        ));
        assert_eq!(&source.fetch().await.unwrap()[..], b"a");
        // No fallback configured.
        assert!(matches!(
            source.fetch().await,
            Err(Error::HttpStatus { status: 503, .. })
        ));
    }

    #[tokio::test]
    async fn test_push_appends_to_script() {
        let source = MockSource::constant(&b"steady"[..]);
        source.push(MockResponse::Body(Bytes::from_static(b"once"))).await;

        assert_eq!(&source.fetch().await.unwrap()[..], b"once");
        assert_eq!(&source.fetch().await.unwrap()[..], b"steady");
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let source = MockSource::constant(&b"ok"[..]);
        source.set_should_fail(true);
        assert!(matches!(
            source.fetch().await,
            Err(Error::HttpStatus { status: 500, .. })
        ));
        source.set_should_fail(false);
        assert!(source.fetch().await.is_ok());
    }

    #[test]
    fn test_fixed_clock() {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 3).unwrap();
        let clock = FixedClock::new(start);
        assert_eq!(clock.now_utc(), start);

        clock.advance(Duration::from_secs(42));
        assert_eq!(clock.now_utc(), start + chrono::Duration::seconds(42));

        let later = Utc.with_ymd_and_hms(2024, 6, 2, 0, 0, 0).unwrap();
        clock.set(later);
        assert_eq!(clock.now_utc(), later);
    }

    #[test]
    fn test_fixed_clock_now_in_timezone() {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 3).unwrap());
        let local = clock.now_in(&chrono_tz::Europe::Prague);
        assert_eq!(local.format("%H:%M:%S").to_string(), "12:00:03");
    }
}
