//! Application state shared across handlers.
//!
//! The state is immutable. The scheduler and the gallery share nothing but
//! the [`ImageStore`], which itself only wraps two directories.

use std::sync::Arc;

use tracing::warn;

use webcam_core::{Clock, Location, SolarWindow, SystemClock};
use webcam_store::ImageStore;

/// Shared application state.
pub struct AppState {
    /// The image archive.
    pub store: Arc<ImageStore>,
    /// Camera location, for the daytime indicator and local timestamps.
    pub location: Location,
    /// Source of "now".
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Create new application state using the system clock.
    pub fn new(store: Arc<ImageStore>, location: Location) -> Arc<Self> {
        Self::with_clock(store, location, Arc::new(SystemClock))
    }

    /// Create new application state with an explicit clock.
    pub fn with_clock(store: Arc<ImageStore>, location: Location, clock: Arc<dyn Clock>) -> Arc<Self> {
        Arc::new(Self {
            store,
            location,
            clock,
        })
    }

    /// Whether the sun is currently up at the camera.
    ///
    /// Reports `false` if the sun window cannot be computed.
    pub fn is_daytime(&self) -> bool {
        let now = self.clock.now_utc();
        match SolarWindow::for_instant(&now, &self.location) {
            Ok(window) => window.is_daytime(&now.with_timezone(&self.location.timezone)),
            Err(e) => {
                warn!("Cannot determine daytime: {}", e);
                false
            }
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("store", &self.store)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}
