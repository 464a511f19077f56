//! Capture verification and solar-aware scheduling for webcam archiving.
//!
//! This crate holds the decision logic of the archiver: fetching snapshots
//! from the remote camera, verifying that a snapshot is stable before it is
//! committed, and choosing how long to wait before the next attempt based on
//! the local sunrise and sunset.
//!
//! # Features
//!
//! - **Sources**: [`ImageSource`] trait with an HTTP implementation and a mock
//! - **Verification**: double fetch with a settle delay, byte-for-byte compare
//! - **Solar window**: sunrise/sunset for a fixed location and elevation
//! - **Interval policy**: twilight, day and night cadences
//!
//! # Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use webcam_core::{CaptureVerifier, HttpSource, IntervalPolicy, Location, SolarWindow};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let location = Location::default();
//!     let source = HttpSource::new("https://example.org/webcam/latest.jpg", Duration::from_secs(30))?;
//!
//!     let capture = CaptureVerifier::new(location.timezone).verify(&source).await?;
//!     println!("Verified {} bytes", capture.len());
//!
//!     let now = chrono::Utc::now();
//!     let window = SolarWindow::for_instant(&now, &location)?;
//!     let wait = IntervalPolicy::default().next_interval(&now.with_timezone(&location.timezone), &window);
//!     println!("Next capture in {:?}", wait);
//!     Ok(())
//! }
//! ```

pub mod clock;
pub mod error;
pub mod interval;
pub mod mock;
pub mod solar;
pub mod source;
pub mod verify;

// Re-export types
pub use webcam_types::{Capture, ImageKey, MinuteBucket, StoredImage, Thumbnail};

pub use clock::{Clock, SystemClock};
pub use error::{Error, Result};
pub use interval::{IntervalPolicy, Period};
pub use mock::{FixedClock, MockResponse, MockSource, MockSourceBuilder};
pub use solar::{Location, SolarWindow, SunWindow};
pub use source::{HttpSource, ImageSource};
pub use verify::CaptureVerifier;
