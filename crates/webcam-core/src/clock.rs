//! Wall-clock abstraction.
//!
//! The scheduler and verifier read the current time through [`Clock`] so that
//! tests can pin captures to a known instant.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current instant in UTC.
    fn now_utc(&self) -> DateTime<Utc>;

    /// Current instant converted to a timezone.
    fn now_in(&self, tz: &Tz) -> DateTime<Tz> {
        self.now_utc().with_timezone(tz)
    }
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
