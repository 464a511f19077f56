//! On-disk archive of verified webcam snapshots.
//!
//! This crate owns the two archive directories: originals named
//! `image_<YYYYMMDD_HHMMSS>.jpg` and thumbnails named
//! `thumb_image_<YYYYMMDD_HHMMSS>.jpg`. The file system is the only state;
//! there is no database or index.
//!
//! # Features
//!
//! - Atomic commits (temporary file, then rename)
//! - Minute-bucket deduplication keeping the largest image
//! - Lazy, idempotent thumbnail generation
//! - Newest-first listing and validated name lookups
//!
//! # Example
//!
//! ```no_run
//! use webcam_store::{ImageStore, ThumbnailOptions};
//!
//! let store = ImageStore::open("images", "thumbnails", ThumbnailOptions::default())?;
//!
//! for image in store.list()? {
//!     let thumb = store.thumbnail(&image);
//!     println!("{} ({} bytes, thumbnail: {:?})", image.file_name(), image.size, thumb);
//! }
//! # Ok::<(), webcam_store::Error>(())
//! ```

mod error;
mod guard;
mod store;
pub mod thumbnail;

pub use error::{Error, Result};
pub use store::ImageStore;
pub use thumbnail::ThumbnailOptions;

/// Default directory for originals, following platform conventions.
///
/// - Linux: `~/.local/share/webcam-archive/images`
/// - macOS: `~/Library/Application Support/webcam-archive/images`
/// - Windows: `C:\Users\<user>\AppData\Local\webcam-archive\images`
pub fn default_images_dir() -> std::path::PathBuf {
    data_dir().join("images")
}

/// Default directory for thumbnails, next to [`default_images_dir`].
pub fn default_thumbnails_dir() -> std::path::PathBuf {
    data_dir().join("thumbnails")
}

fn data_dir() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("webcam-archive")
}
