//! Background acquisition scheduler.
//!
//! One loop on a dedicated task: verify a snapshot, commit it, make sure it
//! has a thumbnail, then sleep for an interval chosen from the sun's
//! position. Every cycle ends in an explicit [`Result`]; failures are logged
//! and never stop the loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use webcam_core::{
    CaptureVerifier, Clock, ImageKey, ImageSource, IntervalPolicy, Location, SolarWindow,
    StoredImage, SystemClock, Thumbnail,
};
use webcam_store::ImageStore;

/// What a successful cycle left in the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleOutcome {
    /// Key of the capture verified in this cycle.
    pub captured: ImageKey,
    /// Size of the verified capture in bytes.
    pub size: usize,
    /// The image that survived the dedup pass for the capture's minute.
    pub survivor: StoredImage,
    /// Thumbnail of the survivor, if it could be produced.
    pub thumbnail: Option<Thumbnail>,
}

impl CycleOutcome {
    /// Whether the new capture itself survived deduplication.
    pub fn kept_capture(&self) -> bool {
        self.survivor.key == self.captured
    }
}

/// Errors ending a single acquisition cycle.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("Acquisition failed: {0}")]
    Acquire(#[from] webcam_core::Error),
    #[error("Failed to store capture: {0}")]
    Store(#[from] webcam_store::Error),
    #[error("Storage task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

/// Periodically captures verified snapshots into the archive.
pub struct AcquisitionScheduler {
    source: Arc<dyn ImageSource>,
    store: Arc<ImageStore>,
    verifier: CaptureVerifier,
    location: Location,
    policy: IntervalPolicy,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for AcquisitionScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcquisitionScheduler")
            .field("source", &self.source.describe())
            .field("store", &self.store)
            .field("verifier", &self.verifier)
            .field("location", &self.location)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl AcquisitionScheduler {
    /// Create a scheduler with the default interval policy and settle delay.
    pub fn new(source: Arc<dyn ImageSource>, store: Arc<ImageStore>, location: Location) -> Self {
        Self {
            source,
            store,
            verifier: CaptureVerifier::new(location.timezone),
            location,
            policy: IntervalPolicy::default(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Use a different interval policy.
    #[must_use]
    pub fn with_policy(mut self, policy: IntervalPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Use a different settle delay between the two downloads.
    #[must_use]
    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.verifier = self.verifier.with_settle_delay(settle_delay);
        self
    }

    /// Use a different clock for capture timestamps and interval decisions.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.verifier = self.verifier.with_clock(Arc::clone(&clock));
        self.clock = clock;
        self
    }

    /// Run one verify, commit and thumbnail cycle.
    pub async fn run_cycle(&self) -> Result<CycleOutcome, CycleError> {
        let capture = self.verifier.verify(&*self.source).await?;
        let captured = capture.key();
        let size = capture.len();

        let store = Arc::clone(&self.store);
        let (survivor, thumbnail) = tokio::task::spawn_blocking(move || {
            let survivor = store.commit(&capture)?;
            let thumbnail = store.thumbnail(&survivor);
            Ok::<_, webcam_store::Error>((survivor, thumbnail))
        })
        .await??;

        Ok(CycleOutcome {
            captured,
            size,
            survivor,
            thumbnail,
        })
    }

    /// How long to wait before the next cycle, as of now.
    ///
    /// Falls back to the night interval if the sun window cannot be computed.
    pub fn next_interval(&self) -> Duration {
        let now = self.clock.now_utc();
        match SolarWindow::for_instant(&now, &self.location) {
            Ok(window) => {
                let local = now.with_timezone(&self.location.timezone);
                let period = self.policy.classify(&local, &window);
                debug!(
                    "Period {} (sunrise {}, sunset {})",
                    period,
                    window.sunrise.format("%H:%M:%S"),
                    window.sunset.format("%H:%M:%S")
                );
                self.policy.interval_for(period)
            }
            Err(e) => {
                warn!("Cannot compute sun window, using night interval: {}", e);
                self.policy.fallback()
            }
        }
    }

    /// Run cycles forever.
    pub async fn run(self) {
        info!(
            "Starting acquisition from {} (settle delay {:?})",
            self.source.describe(),
            self.verifier.settle_delay()
        );

        let mut consecutive_failures = 0u32;

        loop {
            match self.run_cycle().await {
                Ok(outcome) => {
                    consecutive_failures = 0;
                    if outcome.kept_capture() {
                        info!(
                            "Saved {} ({} bytes)",
                            outcome.survivor.file_name(),
                            outcome.size
                        );
                    } else {
                        info!(
                            "Capture {} ({} bytes) discarded, {} ({} bytes) kept for this minute",
                            outcome.captured,
                            outcome.size,
                            outcome.survivor.file_name(),
                            outcome.survivor.size
                        );
                    }
                }
                Err(e) => {
                    consecutive_failures += 1;
                    if consecutive_failures <= 3 {
                        warn!("Capture failed: {} (attempt {})", e, consecutive_failures);
                    } else if consecutive_failures == 4 {
                        error!(
                            "Capture failed {} times in a row, will continue trying silently: {}",
                            consecutive_failures, e
                        );
                    } else {
                        debug!("Capture failed: {} (attempt {})", e, consecutive_failures);
                    }
                }
            }

            let wait = self.next_interval();
            info!("Next capture in {} seconds", wait.as_secs());
            tokio::time::sleep(wait).await;
        }
    }

    /// Spawn [`run`](Self::run) on the runtime.
    ///
    /// Returns immediately; acquisition happens in the background.
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
