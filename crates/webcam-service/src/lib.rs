//! Acquisition scheduler and HTTP gallery for a webcam archive.
//!
//! This crate provides a service that:
//! - Downloads the camera's latest snapshot on a sun-aware schedule
//! - Accepts a snapshot only if two downloads a few seconds apart match
//! - Keeps the largest image per calendar minute
//! - Serves a browsable gallery with thumbnails
//!
//! # HTTP Endpoints
//!
//! - `GET /` - HTML gallery grouped by day
//! - `GET /images/{filename}` - Original image
//! - `GET /thumbnails/{filename}` - Thumbnail
//! - `GET /api/health` - Service health check
//! - `GET /api/images` - JSON listing
//!
//! # Configuration
//!
//! The service reads configuration from `~/.config/webcam-archive/server.toml`:
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0:8001"
//!
//! [storage]
//! images_dir = "/app/images"
//! thumbnails_dir = "/app/thumbnails"
//!
//! [source]
//! url = "https://chalupanarozcesti.cz/webcam/latest.php"
//!
//! [location]
//! latitude = 50.7056489
//! longitude = 15.6749678
//! elevation = 1350.0
//! timezone = "Europe/Prague"
//! ```

pub mod api;
pub mod config;
pub mod gallery;
pub mod scheduler;
pub mod state;

pub use config::{
    Config, ConfigError, LocationConfig, ScheduleConfig, ServerConfig, SourceConfig,
    StorageConfig, ThumbnailConfig, ValidationError,
};
pub use scheduler::{AcquisitionScheduler, CycleError, CycleOutcome};
pub use state::AppState;
