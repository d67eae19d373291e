// libs/appointment-cell/src/services/temporal.rs
use std::sync::Mutex;

use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime, Weekday};

use crate::models::{AppointmentError, ClockTime};

/// Formats a calendar date as zero-padded `YYYY-MM-DD`.
pub fn to_iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn parse_iso_date(iso: &str) -> Result<NaiveDate, AppointmentError> {
    NaiveDate::parse_from_str(iso.trim(), "%Y-%m-%d")
        .map_err(|_| AppointmentError::InvalidInput(format!("'{}' is not a YYYY-MM-DD date", iso)))
}

/// Calendar arithmetic; `delta` may be negative.
pub fn add_days(date: NaiveDate, delta: i64) -> NaiveDate {
    date + Duration::days(delta)
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

pub fn is_past(date: NaiveDate, today: NaiveDate) -> bool {
    date < today
}

/// A day admits no mutation when it is a weekend or before today.
pub fn is_closed(date: NaiveDate, today: NaiveDate) -> bool {
    is_weekend(date) || is_past(date, today)
}

/// Signed whole minutes from `now` until `(date, time)`, rounded to the nearest
/// minute with halves rounding up. Positive means the target is in the future.
pub fn minutes_until(date: NaiveDate, time: ClockTime, now: NaiveDateTime) -> i64 {
    let target = date.and_time(time.to_naive_time());
    let millis = (target - now).num_milliseconds();
    (millis + 30_000).div_euclid(60_000)
}

/// Source of the evaluation instant for closed-day checks and chat gating.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }

    fn time_of_day(&self) -> ClockTime {
        ClockTime::from(self.now().time())
    }
}

/// Local wall clock, no timezone conversion.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock pinned to a settable instant.
#[derive(Debug)]
pub struct FixedClock {
    instant: Mutex<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(instant: NaiveDateTime) -> Self {
        Self {
            instant: Mutex::new(instant),
        }
    }

    pub fn at(date: NaiveDate, time: ClockTime) -> Self {
        Self::new(date.and_time(time.to_naive_time()))
    }

    pub fn set(&self, instant: NaiveDateTime) {
        *self.instant.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = instant;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.instant.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.instant.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
