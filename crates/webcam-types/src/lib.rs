//! Platform-agnostic types for archived webcam snapshots.
//!
//! This crate provides the shared vocabulary used by the acquisition core,
//! the on-disk store and the gallery service.
//!
//! # Features
//!
//! - [`ImageKey`]: the typed `YYYYMMDD_HHMMSS` primary key of a stored image
//! - [`MinuteBucket`]: the calendar-minute group used for deduplication
//! - [`Capture`], [`StoredImage`] and [`Thumbnail`] records
//! - Error types for key and file name parsing
//!
//! # Example
//!
//! ```
//! use webcam_types::ImageKey;
//!
//! let key = ImageKey::from_file_name("image_20240601_120003.jpg").unwrap();
//! assert_eq!(key.to_string(), "20240601_120003");
//! ```

pub mod error;
pub mod types;

pub use error::{ParseError, ParseResult};
pub use types::{
    Capture, IMAGE_EXTENSION, IMAGE_PREFIX, ImageKey, MinuteBucket, StoredImage,
    THUMBNAIL_PREFIX, Thumbnail,
};
