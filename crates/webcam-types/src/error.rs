//! Error types for parsing image identities in webcam-types.

use thiserror::Error;

/// Errors that can occur when parsing image keys or file names.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseError {
    /// The timestamp key is not in `YYYYMMDD_HHMMSS` form.
    #[error("Invalid image key: {0}")]
    InvalidKey(String),

    /// The file name does not follow the archive naming scheme.
    #[error("Invalid file name: {0}")]
    InvalidFileName(String),
}

/// Result type alias using webcam-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
