//! Core types for archived webcam images.

use core::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use bytes::Bytes;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Timelike};
use chrono_tz::Tz;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{ParseError, ParseResult};

/// Prefix of every stored original.
pub const IMAGE_PREFIX: &str = "image_";
/// Prefix prepended to an original's file name to name its thumbnail.
pub const THUMBNAIL_PREFIX: &str = "thumb_";
/// Extension shared by originals and thumbnails.
pub const IMAGE_EXTENSION: &str = "jpg";

const KEY_FORMAT: &str = "%Y%m%d_%H%M%S";
const BUCKET_FORMAT: &str = "%Y%m%d_%H%M";
const KEY_LEN: usize = 15;

/// Timestamp key identifying a stored image.
///
/// A key is a local civil date and time at second resolution. Its text form
/// is `YYYYMMDD_HHMMSS`, so the lexicographic order of file names matches the
/// chronological order of keys.
///
/// # Examples
///
/// ```
/// use webcam_types::ImageKey;
///
/// let key: ImageKey = "20240601_120003".parse().unwrap();
/// assert_eq!(key.file_name(), "image_20240601_120003.jpg");
/// assert_eq!(key.thumbnail_name(), "thumb_image_20240601_120003.jpg");
/// assert_eq!(key.bucket().to_string(), "20240601_1200");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(into = "String", try_from = "String")
)]
pub struct ImageKey(NaiveDateTime);

impl ImageKey {
    /// Create a key from a local civil date-time, dropping sub-second precision.
    #[must_use]
    pub fn new(datetime: NaiveDateTime) -> Self {
        Self(datetime.with_nanosecond(0).unwrap_or(datetime))
    }

    /// Key for an instant, using the instant's own local civil time.
    #[must_use]
    pub fn from_local<T: TimeZone>(instant: &DateTime<T>) -> Self {
        Self::new(instant.naive_local())
    }

    /// Parse the key out of an original's file name (`image_<key>.jpg`).
    pub fn from_file_name(name: &str) -> ParseResult<Self> {
        name.strip_prefix(IMAGE_PREFIX)
            .and_then(|rest| rest.strip_suffix(IMAGE_EXTENSION))
            .and_then(|rest| rest.strip_suffix('.'))
            .ok_or_else(|| ParseError::InvalidFileName(name.to_string()))?
            .parse()
    }

    /// Parse the key out of a thumbnail's file name (`thumb_image_<key>.jpg`).
    pub fn from_thumbnail_name(name: &str) -> ParseResult<Self> {
        let original = name
            .strip_prefix(THUMBNAIL_PREFIX)
            .ok_or_else(|| ParseError::InvalidFileName(name.to_string()))?;
        Self::from_file_name(original)
    }

    /// The local civil date-time of this key.
    #[must_use]
    pub fn datetime(&self) -> NaiveDateTime {
        self.0
    }

    /// The calendar day of this key.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.0.date()
    }

    /// The calendar-minute bucket this key belongs to.
    #[must_use]
    pub fn bucket(&self) -> MinuteBucket {
        MinuteBucket::from_key(self)
    }

    /// File name of the original stored under this key.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{IMAGE_PREFIX}{self}.{IMAGE_EXTENSION}")
    }

    /// File name of the thumbnail derived from this key's original.
    #[must_use]
    pub fn thumbnail_name(&self) -> String {
        format!("{THUMBNAIL_PREFIX}{}", self.file_name())
    }

    /// Attach a timezone to this key.
    ///
    /// Ambiguous local times (DST fall-back) resolve to the earlier instant;
    /// nonexistent local times (DST spring-forward gap) yield `None`.
    #[must_use]
    pub fn localize(&self, tz: &Tz) -> Option<DateTime<Tz>> {
        tz.from_local_datetime(&self.0).earliest()
    }
}

impl fmt::Display for ImageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(KEY_FORMAT))
    }
}

impl FromStr for ImageKey {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // chrono's %Y accepts signs and extra digits; keep the layout strict.
        let well_formed = s.len() == KEY_LEN
            && s.bytes().enumerate().all(|(i, b)| match i {
                8 => b == b'_',
                _ => b.is_ascii_digit(),
            });
        if !well_formed {
            return Err(ParseError::InvalidKey(s.to_string()));
        }

        NaiveDateTime::parse_from_str(s, KEY_FORMAT)
            .map(Self)
            .map_err(|_| ParseError::InvalidKey(s.to_string()))
    }
}

impl From<ImageKey> for String {
    fn from(key: ImageKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for ImageKey {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A calendar-minute bucket (`YYYYMMDD_HHMM`).
///
/// Captures whose keys share a bucket are considered duplicates of each
/// other. Buckets are aligned to the calendar minute, not a sliding window:
/// `12:00:59` and `12:01:01` fall into different buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MinuteBucket(NaiveDateTime);

impl MinuteBucket {
    fn from_key(key: &ImageKey) -> Self {
        let dt = key.datetime();
        Self(dt.with_second(0).unwrap_or(dt))
    }

    /// Whether a key falls into this bucket.
    #[must_use]
    pub fn contains(&self, key: &ImageKey) -> bool {
        key.bucket() == *self
    }

    /// First instant of the bucket.
    #[must_use]
    pub fn start(&self) -> NaiveDateTime {
        self.0
    }
}

impl fmt::Display for MinuteBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(BUCKET_FORMAT))
    }
}

/// A candidate image held in memory while it is being verified.
#[derive(Debug, Clone, PartialEq)]
pub struct Capture {
    /// Raw JPEG bytes as downloaded.
    pub bytes: Bytes,
    /// When the capture was accepted, in the archive's local timezone.
    pub captured_at: DateTime<Tz>,
}

impl Capture {
    /// Create a new capture.
    pub fn new(bytes: impl Into<Bytes>, captured_at: DateTime<Tz>) -> Self {
        Self {
            bytes: bytes.into(),
            captured_at,
        }
    }

    /// The key this capture will be stored under.
    #[must_use]
    pub fn key(&self) -> ImageKey {
        ImageKey::from_local(&self.captured_at)
    }

    /// Payload size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// An image persisted in the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StoredImage {
    /// Timestamp key, derived from the file name.
    pub key: ImageKey,
    /// Location of the original on disk.
    pub path: PathBuf,
    /// File size in bytes.
    pub size: u64,
}

impl StoredImage {
    /// File name of the original.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.key.file_name()
    }

    /// File name of the matching thumbnail.
    #[must_use]
    pub fn thumbnail_name(&self) -> String {
        self.key.thumbnail_name()
    }

    /// Local civil capture time, taken from the key rather than file metadata.
    #[must_use]
    pub fn captured_at(&self) -> NaiveDateTime {
        self.key.datetime()
    }
}

/// A thumbnail derived from a stored image.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Thumbnail {
    /// Key of the original this thumbnail belongs to.
    pub key: ImageKey,
    /// Location of the thumbnail on disk.
    pub path: PathBuf,
}

impl Thumbnail {
    /// File name of the thumbnail.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.key.thumbnail_name()
    }
}
