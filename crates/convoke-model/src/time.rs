//! Time values for calendar entries.
//!
//! A calendar entry's start or end is either a specific instant (stored in
//! UTC) or a bare date for all-day entries. [`CalTime`] is that sum, with
//! the shifting helpers the recurrence-exception engine relies on.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// The time of a calendar entry: a UTC instant or an all-day date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CalTime {
    /// A specific instant, stored in UTC.
    DateTime(DateTime<Utc>),
    /// An all-day date with no time of day.
    Date(NaiveDate),
}

impl CalTime {
    /// Creates a `CalTime` from a UTC instant.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self::DateTime(dt)
    }

    /// Creates a `CalTime` from an instant in any timezone.
    pub fn from_zoned<Tz: TimeZone>(dt: DateTime<Tz>) -> Self {
        Self::DateTime(dt.with_timezone(&Utc))
    }

    /// Creates an all-day `CalTime`.
    pub fn from_date(date: NaiveDate) -> Self {
        Self::Date(date)
    }

    /// Returns `true` for all-day values.
    pub fn is_date_only(&self) -> bool {
        matches!(self, Self::Date(_))
    }

    /// Returns the instant if this is a `DateTime` value.
    pub fn as_datetime(&self) -> Option<&DateTime<Utc>> {
        match self {
            Self::DateTime(dt) => Some(dt),
            Self::Date(_) => None,
        }
    }

    /// Returns the date if this is an all-day value.
    pub fn as_date(&self) -> Option<&NaiveDate> {
        match self {
            Self::Date(d) => Some(d),
            Self::DateTime(_) => None,
        }
    }

    /// Converts to a UTC instant; all-day values map to midnight UTC.
    pub fn to_utc(&self) -> DateTime<Utc> {
        match self {
            Self::DateTime(dt) => *dt,
            Self::Date(date) => date.and_hms_opt(0, 0, 0).expect("valid time").and_utc(),
        }
    }

    /// Returns the calendar date of this value (UTC for instants).
    pub fn date(&self) -> NaiveDate {
        match self {
            Self::DateTime(dt) => dt.date_naive(),
            Self::Date(date) => *date,
        }
    }

    /// Returns the calendar date of this value in the given timezone.
    ///
    /// All-day values are timezone-independent.
    pub fn date_in<Tz: TimeZone>(&self, tz: &Tz) -> NaiveDate {
        match self {
            Self::DateTime(dt) => dt.with_timezone(tz).date_naive(),
            Self::Date(date) => *date,
        }
    }

    /// Shifts this value by whole days, keeping its variant.
    pub fn shift_days(&self, days: i64) -> Self {
        match self {
            Self::DateTime(dt) => Self::DateTime(*dt + Duration::days(days)),
            Self::Date(date) => Self::Date(*date + Duration::days(days)),
        }
    }

    /// Shifts this value by exact seconds.
    ///
    /// An all-day value stays date-only and moves by the whole days the
    /// offset spans.
    pub fn shift_seconds(&self, seconds: i64) -> Self {
        match self {
            Self::DateTime(dt) => Self::DateTime(*dt + Duration::seconds(seconds)),
            Self::Date(date) => Self::Date(*date + Duration::days(seconds / 86_400)),
        }
    }

    /// Seconds from this value to `other`, comparing as UTC instants.
    pub fn seconds_to(&self, other: &CalTime) -> i64 {
        (other.to_utc() - self.to_utc()).num_seconds()
    }

    /// Whole days from this value's date to `other`.
    pub fn days_to(&self, other: &CalTime) -> i64 {
        (other.date() - self.date()).num_days()
    }
}

impl PartialOrd for CalTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CalTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_utc().cmp(&other.to_utc())
    }
}
