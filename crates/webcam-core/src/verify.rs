//! Double-fetch verification of snapshots.
//!
//! The remote source gives no atomicity guarantee for concurrent writers and
//! no ETag or content hash. A snapshot is therefore accepted only if two
//! downloads separated by a short settle delay are byte-identical.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono_tz::Tz;
use tracing::debug;

use webcam_types::Capture;

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::source::ImageSource;

/// Default wait between the two downloads.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(5);

/// Accepts or rejects candidate snapshots.
pub struct CaptureVerifier {
    settle_delay: Duration,
    timezone: Tz,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for CaptureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureVerifier")
            .field("settle_delay", &self.settle_delay)
            .field("timezone", &self.timezone)
            .finish_non_exhaustive()
    }
}

impl CaptureVerifier {
    /// Create a verifier stamping captures in `timezone` using the system clock.
    pub fn new(timezone: Tz) -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
            timezone,
            clock: Arc::new(SystemClock),
        }
    }

    /// Use a different settle delay.
    #[must_use]
    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    /// Use a different clock for capture timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The configured settle delay.
    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    /// Fetch twice and accept the snapshot only if both downloads match.
    ///
    /// A failed first fetch skips the second one. The accepted capture is
    /// stamped with the clock's current time in the verifier's timezone.
    pub async fn verify<S: ImageSource + ?Sized>(&self, source: &S) -> Result<Capture> {
        let first = source.fetch().await?;
        debug!(
            "First download from {}: {} bytes, settling for {:?}",
            source.describe(),
            first.len(),
            self.settle_delay
        );

        tokio::time::sleep(self.settle_delay).await;

        let second = source.fetch().await?;
        let bytes = compare(first, second)?;

        Ok(Capture::new(bytes, self.clock.now_in(&self.timezone)))
    }
}

/// Accept `first` if it is byte-identical to `second`.
pub fn compare(first: Bytes, second: Bytes) -> Result<Bytes> {
    if first == second {
        Ok(first)
    } else {
        Err(Error::VerificationMismatch {
            first_len: first.len(),
            second_len: second.len(),
        })
    }
}
