//! Error types for webcam-core.
//!
//! Every variant describes a reason to skip the current acquisition cycle.
//! None of them is fatal to the scheduler: it logs the error and tries again
//! after the next interval.
//!
//! | Error Type | Cause |
//! |------------|-------|
//! | [`Error::Transport`] | Request could not be sent or its body could not be read |
//! | [`Error::HttpStatus`] | Source answered with a non-success status |
//! | [`Error::VerificationMismatch`] | The two fetches returned different bytes |
//! | [`Error::Computation`] | Sunrise/sunset could not be computed for the date |
//! | [`Error::InvalidConfig`] | A source or location setting is unusable |

use thiserror::Error;

/// Errors that can occur while acquiring and verifying captures.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The remote fetch failed before a response body was received.
    #[error("Failed to fetch {url}: {source}")]
    Transport {
        /// The URL being fetched.
        url: String,
        /// Underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },

    /// The remote source answered with a non-success status.
    #[error("Source {url} returned HTTP {status}")]
    HttpStatus {
        /// The URL being fetched.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// Two consecutive fetches disagreed, the source was likely mid-write.
    #[error("Downloads don't match ({first_len} vs {second_len} bytes)")]
    VerificationMismatch {
        /// Size of the first download.
        first_len: usize,
        /// Size of the second download.
        second_len: usize,
    },

    /// Sunrise/sunset could not be computed.
    #[error("Solar computation failed: {0}")]
    Computation(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias using webcam-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatch_display() {
        let err = Error::VerificationMismatch {
            first_len: 1000,
            second_len: 812,
        };
        assert_eq!(err.to_string(), "Downloads don't match (1000 vs 812 bytes)");
    }

    #[test]
    fn test_http_status_display() {
        let err = Error::HttpStatus {
            url: "http://cam.local/latest.jpg".to_string(),
            status: 503,
        };
        let msg = err.to_string();
        assert!(msg.contains("cam.local"));
        assert!(msg.contains("503"));
    }

    #[test]
    fn test_computation_display() {
        let err = Error::Computation("polar night".to_string());
        assert_eq!(err.to_string(), "Solar computation failed: polar night");
    }
}
