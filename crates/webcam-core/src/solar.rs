//! Sunrise and sunset for the camera's location.
//!
//! The astronomical formula is delegated to the `sunrise` crate; this module
//! fixes the observer (coordinates, elevation, civil timezone) and converts
//! the results into local time.

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use chrono_tz::Tz;
use sunrise::{Coordinates, SolarDay, SolarEvent};

use crate::error::{Error, Result};

/// Latitude of the default camera location.
pub const DEFAULT_LATITUDE: f64 = 50.7056489;
/// Longitude of the default camera location.
pub const DEFAULT_LONGITUDE: f64 = 15.6749678;
/// Elevation of the default camera location in meters.
pub const DEFAULT_ELEVATION: f64 = 1350.0;
/// Civil timezone of the default camera location.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Europe::Prague;

/// Geographic position of the camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    /// Latitude in degrees, north positive.
    pub latitude: f64,
    /// Longitude in degrees, east positive.
    pub longitude: f64,
    /// Elevation above sea level in meters.
    pub elevation: f64,
    /// Civil timezone used for file names and the gallery.
    pub timezone: Tz,
}

impl Default for Location {
    fn default() -> Self {
        Self {
            latitude: DEFAULT_LATITUDE,
            longitude: DEFAULT_LONGITUDE,
            elevation: DEFAULT_ELEVATION,
            timezone: DEFAULT_TIMEZONE,
        }
    }
}

impl Location {
    /// Create a location, validating the coordinates.
    pub fn new(latitude: f64, longitude: f64, elevation: f64, timezone: Tz) -> Result<Self> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(Error::InvalidConfig(format!(
                "latitude {latitude} out of range [-90, 90]"
            )));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(Error::InvalidConfig(format!(
                "longitude {longitude} out of range [-180, 180]"
            )));
        }
        if !elevation.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "elevation {elevation} is not a finite number"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
            elevation,
            timezone,
        })
    }

    /// Current date at this location.
    #[must_use]
    pub fn local_date(&self, now: &DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.timezone).date_naive()
    }
}

/// Sunrise and sunset instants for one calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SunWindow {
    /// Sunrise in the location's timezone.
    pub sunrise: DateTime<Tz>,
    /// Sunset in the location's timezone.
    pub sunset: DateTime<Tz>,
}

impl SunWindow {
    /// Whether `now` lies between sunrise and sunset, both inclusive.
    #[must_use]
    pub fn is_daytime(&self, now: &DateTime<Tz>) -> bool {
        self.sunrise <= *now && *now <= self.sunset
    }
}

/// Computes the [`SunWindow`] for a date and location.
#[derive(Debug, Clone, Copy, Default)]
pub struct SolarWindow;

impl SolarWindow {
    /// Sunrise and sunset for `date` at `location`.
    ///
    /// Fails with [`Error::Computation`] when the location is invalid or the
    /// sun does not rise and set on that date (polar day or night).
    pub fn compute(date: NaiveDate, location: &Location) -> Result<SunWindow> {
        let coord = Coordinates::new(location.latitude, location.longitude).ok_or_else(|| {
            Error::Computation(format!(
                "invalid coordinates {}, {}",
                location.latitude, location.longitude
            ))
        })?;

        let day = SolarDay::new(coord, date).with_altitude(location.elevation);
        let sunrise = day.event_time(SolarEvent::Sunrise);
        let sunset = day.event_time(SolarEvent::Sunset);

        // Polar day/night surfaces as NaN inside the formula, which ends up as
        // an instant nowhere near the requested date.
        let noon = date
            .and_hms_opt(12, 0, 0)
            .map(|dt| dt.and_utc())
            .ok_or_else(|| Error::Computation(format!("invalid date {date}")))?;
        let plausible = |t: &DateTime<Utc>| (*t - noon).abs() <= TimeDelta::hours(36);
        if !plausible(&sunrise) || !plausible(&sunset) || sunrise >= sunset {
            return Err(Error::Computation(format!(
                "no sunrise/sunset on {date} at {:.4}, {:.4}",
                location.latitude, location.longitude
            )));
        }

        Ok(SunWindow {
            sunrise: sunrise.with_timezone(&location.timezone),
            sunset: sunset.with_timezone(&location.timezone),
        })
    }

    /// Sun window for the local date of `now`.
    pub fn for_instant(now: &DateTime<Utc>, location: &Location) -> Result<SunWindow> {
        Self::compute(location.local_date(now), location)
    }
}
