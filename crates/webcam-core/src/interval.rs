//! Capture cadence driven by the day/night cycle.
//!
//! Light changes fastest around sunrise and sunset, so those periods are
//! sampled finely; stable daylight and night are sampled coarsely.
//!
//! | Period | Condition | Default interval |
//! |--------|-----------|------------------|
//! | [`Period::Twilight`] | daytime and within ±1h of sunrise or sunset | 2 minutes |
//! | [`Period::Day`] | between sunrise and sunset otherwise | 10 minutes |
//! | [`Period::Night`] | before sunrise or after sunset | 30 minutes |
//!
//! Every decision is recomputed from scratch; there is no hysteresis, so a
//! clock adjustment or DST change simply yields a different answer next time.

use core::fmt;
use std::time::Duration;

use chrono::DateTime;
use chrono_tz::Tz;

use crate::solar::SunWindow;

/// Default interval during plain daylight.
pub const DEFAULT_DAY_INTERVAL: Duration = Duration::from_secs(600);
/// Default interval around sunrise and sunset.
pub const DEFAULT_TWILIGHT_INTERVAL: Duration = Duration::from_secs(120);
/// Default interval at night, also used when the sun window is unavailable.
pub const DEFAULT_NIGHT_INTERVAL: Duration = Duration::from_secs(1800);
/// Default half-width of the windows around sunrise and sunset.
pub const DEFAULT_TWILIGHT_MARGIN: Duration = Duration::from_secs(3600);

/// Part of the solar day an instant falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    /// Daylight away from sunrise and sunset.
    Day,
    /// Daylight within the margin around sunrise or sunset.
    Twilight,
    /// Before sunrise or after sunset.
    Night,
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Day => write!(f, "daytime"),
            Period::Twilight => write!(f, "sunrise/sunset"),
            Period::Night => write!(f, "nighttime"),
        }
    }
}

/// Decides how long to wait before the next capture attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalPolicy {
    /// Interval during plain daylight.
    pub day: Duration,
    /// Interval within the twilight margin.
    pub twilight: Duration,
    /// Interval at night.
    pub night: Duration,
    /// Half-width of the windows around sunrise and sunset.
    pub twilight_margin: Duration,
}

impl Default for IntervalPolicy {
    fn default() -> Self {
        Self {
            day: DEFAULT_DAY_INTERVAL,
            twilight: DEFAULT_TWILIGHT_INTERVAL,
            night: DEFAULT_NIGHT_INTERVAL,
            twilight_margin: DEFAULT_TWILIGHT_MARGIN,
        }
    }
}

impl IntervalPolicy {
    /// Classify an instant against a sun window.
    ///
    /// Daytime includes both `sunrise` and `sunset` themselves. The twilight
    /// windows are closed intervals too.
    #[must_use]
    pub fn classify(&self, now: &DateTime<Tz>, window: &SunWindow) -> Period {
        let now = now.timestamp();
        let sunrise = window.sunrise.timestamp();
        let sunset = window.sunset.timestamp();
        let margin = i64::try_from(self.twilight_margin.as_secs()).unwrap_or(i64::MAX);

        let within = |center: i64| {
            center.saturating_sub(margin) <= now && now <= center.saturating_add(margin)
        };

        if sunrise <= now && now <= sunset {
            if within(sunrise) || within(sunset) {
                Period::Twilight
            } else {
                Period::Day
            }
        } else {
            Period::Night
        }
    }

    /// Interval configured for a period.
    #[must_use]
    pub fn interval_for(&self, period: Period) -> Duration {
        match period {
            Period::Day => self.day,
            Period::Twilight => self.twilight,
            Period::Night => self.night,
        }
    }

    /// Interval until the next capture attempt.
    #[must_use]
    pub fn next_interval(&self, now: &DateTime<Tz>, window: &SunWindow) -> Duration {
        self.interval_for(self.classify(now, window))
    }

    /// Conservative interval used when no sun window could be computed.
    #[must_use]
    pub fn fallback(&self) -> Duration {
        self.night
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Europe::Prague;
    use proptest::prelude::*;

    fn at(hour: u32, minute: u32) -> DateTime<Tz> {
        Prague.with_ymd_and_hms(2024, 6, 1, hour, minute, 0).unwrap()
    }

    fn window() -> SunWindow {
        SunWindow {
            sunrise: at(6, 0),
            sunset: at(20, 0),
        }
    }

    #[test]
    fn test_reference_schedule() {
        let policy = IntervalPolicy::default();
        let w = window();

        assert_eq!(policy.next_interval(&at(5, 30), &w), Duration::from_secs(1800));
        assert_eq!(policy.next_interval(&at(6, 15), &w), Duration::from_secs(120));
        assert_eq!(policy.next_interval(&at(12, 0), &w), Duration::from_secs(600));
        assert_eq!(policy.next_interval(&at(19, 45), &w), Duration::from_secs(120));
        assert_eq!(policy.next_interval(&at(21, 0), &w), Duration::from_secs(1800));
    }

    #[test]
    fn test_boundaries_are_daytime() {
        let policy = IntervalPolicy::default();
        let w = window();

        assert_eq!(policy.classify(&at(6, 0), &w), Period::Twilight);
        assert_eq!(policy.classify(&at(20, 0), &w), Period::Twilight);
        assert_eq!(
            policy.classify(&(at(6, 0) - chrono::Duration::seconds(1)), &w),
            Period::Night
        );
        assert_eq!(
            policy.classify(&(at(20, 0) + chrono::Duration::seconds(1)), &w),
            Period::Night
        );
    }

    #[test]
    fn test_twilight_margin_edges() {
        let policy = IntervalPolicy::default();
        let w = window();

        assert_eq!(policy.classify(&at(7, 0), &w), Period::Twilight);
        assert_eq!(policy.classify(&at(7, 1), &w), Period::Day);
        assert_eq!(policy.classify(&at(19, 0), &w), Period::Twilight);
        assert_eq!(policy.classify(&at(18, 59), &w), Period::Day);
    }

    #[test]
    fn test_short_day_is_all_twilight() {
        let policy = IntervalPolicy::default();
        let w = SunWindow {
            sunrise: at(10, 0),
            sunset: at(11, 30),
        };
        assert_eq!(policy.classify(&at(10, 45), &w), Period::Twilight);
    }

    #[test]
    fn test_custom_intervals() {
        let policy = IntervalPolicy {
            day: Duration::from_secs(300),
            twilight: Duration::from_secs(60),
            night: Duration::from_secs(3600),
            twilight_margin: Duration::from_secs(1800),
        };
        let w = window();

        assert_eq!(policy.next_interval(&at(6, 45), &w), Duration::from_secs(300));
        assert_eq!(policy.next_interval(&at(6, 29), &w), Duration::from_secs(60));
        assert_eq!(policy.next_interval(&at(23, 0), &w), Duration::from_secs(3600));
    }

    #[test]
    fn test_fallback_is_night_interval() {
        let policy = IntervalPolicy::default();
        assert_eq!(policy.fallback(), Duration::from_secs(1800));
    }

    #[test]
    fn test_period_display() {
        assert_eq!(Period::Day.to_string(), "daytime");
        assert_eq!(Period::Twilight.to_string(), "sunrise/sunset");
        assert_eq!(Period::Night.to_string(), "nighttime");
    }

    proptest! {
        #[test]
        fn prop_interval_is_one_of_three(minute_of_day in 0u32..1440) {
            let policy = IntervalPolicy::default();
            let now = at(minute_of_day / 60, minute_of_day % 60);
            let interval = policy.next_interval(&now, &window());
            prop_assert!(
                interval == policy.day || interval == policy.twilight || interval == policy.night
            );
        }

        #[test]
        fn prop_outside_sun_window_is_night(minute_of_day in 0u32..1440) {
            let policy = IntervalPolicy::default();
            let now = at(minute_of_day / 60, minute_of_day % 60);
            let w = window();
            if now < w.sunrise || now > w.sunset {
                prop_assert_eq!(policy.classify(&now, &w), Period::Night);
            } else {
                prop_assert_ne!(policy.classify(&now, &w), Period::Night);
            }
        }
    }
}
