//! Server configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use webcam_core::{IntervalPolicy, Location};
use webcam_store::ThumbnailOptions;

/// Server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server settings.
    pub server: ServerConfig,
    /// Storage settings.
    pub storage: StorageConfig,
    /// Remote snapshot source.
    pub source: SourceConfig,
    /// Camera location used for sunrise and sunset.
    pub location: LocationConfig,
    /// Capture cadence.
    pub schedule: ScheduleConfig,
    /// Thumbnail rendering.
    pub thumbnails: ThumbnailConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Save configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return every problem found.
    ///
    /// This checks:
    /// - Server bind address is valid (host:port format)
    /// - Storage directories are not empty
    /// - Source URL is http(s) and the timeout is non-zero
    /// - Coordinates are in range and the timezone is a known IANA name
    /// - Capture intervals are within reasonable bounds (10s - 24 hours)
    /// - Thumbnail size and quality are usable
    ///
    /// # Example
    ///
    /// ```
    /// use webcam_service::Config;
    ///
    /// let config = Config::default();
    /// config.validate().expect("Default config should be valid");
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        errors.extend(self.server.validate());
        errors.extend(self.storage.validate());
        errors.extend(self.source.validate());
        errors.extend(self.location.validate());
        errors.extend(self.schedule.validate());
        errors.extend(self.thumbnails.validate());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8001").
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8001".to_string(),
        }
    }
}

impl ServerConfig {
    /// Validate server configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.bind.is_empty() {
            errors.push(ValidationError::new(
                "server.bind",
                "bind address cannot be empty",
            ));
            return errors;
        }

        let Some((_, port)) = self.bind.rsplit_once(':') else {
            errors.push(ValidationError::new(
                "server.bind",
                format!(
                    "invalid bind address '{}': expected format 'host:port'",
                    self.bind
                ),
            ));
            return errors;
        };

        match port.parse::<u16>() {
            Ok(0) => errors.push(ValidationError::new("server.bind", "port cannot be 0")),
            Err(_) => errors.push(ValidationError::new(
                "server.bind",
                format!("invalid port '{}': must be a number 1-65535", port),
            )),
            Ok(_) => {}
        }

        errors
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for original images.
    pub images_dir: PathBuf,
    /// Directory for thumbnails.
    pub thumbnails_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            images_dir: webcam_store::default_images_dir(),
            thumbnails_dir: webcam_store::default_thumbnails_dir(),
        }
    }
}

impl StorageConfig {
    /// Validate storage configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.images_dir.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "storage.images_dir",
                "images directory cannot be empty",
            ));
        }
        if self.thumbnails_dir.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "storage.thumbnails_dir",
                "thumbnails directory cannot be empty",
            ));
        }

        errors
    }
}

/// Default snapshot URL of the original deployment.
pub const DEFAULT_SOURCE_URL: &str = "https://chalupanarozcesti.cz/webcam/latest.php";

/// Remote source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// URL returning the latest JPEG snapshot.
    pub url: String,
    /// Seconds to wait between the two verification downloads.
    pub settle_delay_secs: u64,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SOURCE_URL.to_string(),
            settle_delay_secs: webcam_core::verify::DEFAULT_SETTLE_DELAY.as_secs(),
            timeout_secs: webcam_core::source::DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

impl SourceConfig {
    /// Settle delay as a duration.
    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay_secs)
    }

    /// Request timeout as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate source configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.url.is_empty() {
            errors.push(ValidationError::new("source.url", "URL cannot be empty"));
        } else if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            errors.push(ValidationError::new(
                "source.url",
                format!("URL '{}' must start with http:// or https://", self.url),
            ));
        }

        if self.timeout_secs == 0 {
            errors.push(ValidationError::new(
                "source.timeout_secs",
                "timeout cannot be 0",
            ));
        }

        errors
    }
}

/// Camera location configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Elevation in meters.
    pub elevation: f64,
    /// IANA timezone name (e.g. "Europe/Prague").
    pub timezone: String,
}

impl Default for LocationConfig {
    fn default() -> Self {
        let location = Location::default();
        Self {
            latitude: location.latitude,
            longitude: location.longitude,
            elevation: location.elevation,
            timezone: location.timezone.name().to_string(),
        }
    }
}

impl LocationConfig {
    /// Build the validated [`Location`].
    pub fn location(&self) -> webcam_core::Result<Location> {
        let timezone: Tz = self.timezone.parse().map_err(|_| {
            webcam_core::Error::InvalidConfig(format!("unknown timezone '{}'", self.timezone))
        })?;
        Location::new(self.latitude, self.longitude, self.elevation, timezone)
    }

    /// Validate location configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if !(-90.0..=90.0).contains(&self.latitude) {
            errors.push(ValidationError::new(
                "location.latitude",
                format!("latitude {} out of range [-90, 90]", self.latitude),
            ));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            errors.push(ValidationError::new(
                "location.longitude",
                format!("longitude {} out of range [-180, 180]", self.longitude),
            ));
        }
        if !self.elevation.is_finite() {
            errors.push(ValidationError::new(
                "location.elevation",
                "elevation must be a finite number",
            ));
        }
        if self.timezone.parse::<Tz>().is_err() {
            errors.push(ValidationError::new(
                "location.timezone",
                format!("unknown timezone '{}'", self.timezone),
            ));
        }

        errors
    }
}

/// Minimum capture interval in seconds (10 seconds).
pub const MIN_INTERVAL: u64 = 10;
/// Maximum capture interval in seconds (24 hours).
pub const MAX_INTERVAL: u64 = 86_400;

/// Capture cadence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Interval during plain daylight, in seconds.
    pub day_interval_secs: u64,
    /// Interval around sunrise and sunset, in seconds.
    pub twilight_interval_secs: u64,
    /// Interval at night, in seconds.
    pub night_interval_secs: u64,
    /// Half-width of the twilight windows, in seconds.
    pub twilight_margin_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        let policy = IntervalPolicy::default();
        Self {
            day_interval_secs: policy.day.as_secs(),
            twilight_interval_secs: policy.twilight.as_secs(),
            night_interval_secs: policy.night.as_secs(),
            twilight_margin_secs: policy.twilight_margin.as_secs(),
        }
    }
}

impl ScheduleConfig {
    /// Build the [`IntervalPolicy`].
    pub fn policy(&self) -> IntervalPolicy {
        IntervalPolicy {
            day: Duration::from_secs(self.day_interval_secs),
            twilight: Duration::from_secs(self.twilight_interval_secs),
            night: Duration::from_secs(self.night_interval_secs),
            twilight_margin: Duration::from_secs(self.twilight_margin_secs),
        }
    }

    /// Validate schedule configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        for (field, value) in [
            ("schedule.day_interval_secs", self.day_interval_secs),
            ("schedule.twilight_interval_secs", self.twilight_interval_secs),
            ("schedule.night_interval_secs", self.night_interval_secs),
        ] {
            if value < MIN_INTERVAL {
                errors.push(ValidationError::new(
                    field,
                    format!(
                        "interval {} is too short (minimum {} seconds)",
                        value, MIN_INTERVAL
                    ),
                ));
            } else if value > MAX_INTERVAL {
                errors.push(ValidationError::new(
                    field,
                    format!(
                        "interval {} is too long (maximum {} seconds / 24 hours)",
                        value, MAX_INTERVAL
                    ),
                ));
            }
        }

        if self.twilight_margin_secs > MAX_INTERVAL {
            errors.push(ValidationError::new(
                "schedule.twilight_margin_secs",
                format!(
                    "margin {} is too long (maximum {} seconds / 24 hours)",
                    self.twilight_margin_secs, MAX_INTERVAL
                ),
            ));
        }

        errors
    }
}

/// Thumbnail configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumbnailConfig {
    /// Longest thumbnail side in pixels.
    pub max_side: u32,
    /// JPEG quality (1-100).
    pub quality: u8,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        let options = ThumbnailOptions::default();
        Self {
            max_side: options.max_side,
            quality: options.quality,
        }
    }
}

impl ThumbnailConfig {
    /// Build the [`ThumbnailOptions`].
    pub fn options(&self) -> ThumbnailOptions {
        ThumbnailOptions {
            max_side: self.max_side,
            quality: self.quality,
        }
    }

    /// Validate thumbnail configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.max_side == 0 {
            errors.push(ValidationError::new(
                "thumbnails.max_side",
                "thumbnail size cannot be 0",
            ));
        }
        if !(1..=100).contains(&self.quality) {
            errors.push(ValidationError::new(
                "thumbnails.quality",
                format!("quality {} out of range 1-100", self.quality),
            ));
        }

        errors
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field path (e.g., `server.bind` or `schedule.day_interval_secs`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("webcam-archive")
        .join("server.toml")
}
