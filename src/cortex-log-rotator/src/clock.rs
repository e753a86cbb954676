//! Time source for rotation and retention decisions.

use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Utc};
use parking_lot::Mutex;

use crate::config::BACKUP_DATE_FORMAT;

/// Source of the current instant.
pub trait Clock: Send + Sync {
    /// Current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Settable clock for simulating calendar-day changes in tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a clock frozen at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Move the clock to `now`.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    /// Move the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// `YYYYMMDD` key of the calendar day containing `instant`.
pub fn day_key(instant: DateTime<Utc>, local_time: bool) -> String {
    if local_time {
        instant
            .with_timezone(&Local)
            .format(BACKUP_DATE_FORMAT)
            .to_string()
    } else {
        instant.format(BACKUP_DATE_FORMAT).to_string()
    }
}

/// Midnight at the start of `date`, as an instant.
///
/// Local midnights that fall into a DST gap resolve to the earliest valid
/// local time after it, falling back to UTC midnight.
pub(crate) fn start_of_day(date: NaiveDate, local_time: bool) -> DateTime<Utc> {
    let midnight = date.and_time(chrono::NaiveTime::MIN);
    if local_time {
        if let Some(local) = Local.from_local_datetime(&midnight).earliest() {
            return local.with_timezone(&Utc);
        }
    }
    Utc.from_utc_datetime(&midnight)
}
