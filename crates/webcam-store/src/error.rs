//! Error types for webcam-store.

use std::path::PathBuf;

use webcam_types::ParseError;

/// Result type for webcam-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in webcam-store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failed to create a storage directory.
    #[error("Failed to create directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A filesystem operation on a stored file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Decoding or encoding an image failed.
    #[error("Image codec error for {path}: {source}")]
    Codec {
        path: PathBuf,
        source: image::ImageError,
    },

    /// The requested name is not an archive file name.
    #[error(transparent)]
    InvalidFileName(#[from] ParseError),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error means the file does not exist (anymore).
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}
