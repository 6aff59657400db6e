//! Recurrence rules.
//!
//! A deliberately small rule model: frequency, interval, an optional
//! occurrence-count bound, an optional end date, and exclusion dates. The
//! exception engine only needs position counting and bound adjustment; it
//! does not expand full RRULE grammar.

use chrono::{Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// How often a recurring entry repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

/// A recurrence rule attached to a calendar entry.
///
/// `count` and `until` are alternative end bounds; a rule with neither
/// recurs forever. `ex_dates` suppresses individual occurrences without
/// changing the rule's shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    /// Step unit.
    pub frequency: Frequency,
    /// Step width in `frequency` units, at least 1.
    pub interval: u32,
    /// End after this many occurrences (the first counts as one).
    pub count: Option<u32>,
    /// Last date an occurrence may fall on.
    pub until: Option<NaiveDate>,
    /// Dates excluded from the series.
    pub ex_dates: Vec<NaiveDate>,
}

impl RecurrenceRule {
    /// Creates a rule recurring forever at the given frequency.
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            interval: 1,
            count: None,
            until: None,
            ex_dates: Vec::new(),
        }
    }

    /// Builder: set the interval (clamped to at least 1).
    pub fn with_interval(mut self, interval: u32) -> Self {
        self.interval = interval.max(1);
        self
    }

    /// Builder: bound the rule by occurrence count.
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    /// Builder: bound the rule by end date.
    pub fn with_until(mut self, until: NaiveDate) -> Self {
        self.until = Some(until);
        self
    }

    /// Replaces the occurrence-count bound.
    pub fn set_count(&mut self, count: u32) {
        self.count = Some(count);
    }

    /// Caps the rule to end on the given date, dropping any count bound.
    pub fn cap_until(&mut self, until: NaiveDate) {
        self.count = None;
        self.until = Some(until);
    }

    /// Adds an exclusion date.
    pub fn add_ex_date(&mut self, date: NaiveDate) {
        if !self.ex_dates.contains(&date) {
            self.ex_dates.push(date);
        }
    }

    /// Returns `true` if the date is excluded from the series.
    pub fn is_ex_date(&self, date: NaiveDate) -> bool {
        self.ex_dates.contains(&date)
    }

    /// The date of the zero-based `n`th occurrence of a series starting at
    /// `start`, ignoring bounds and exclusions.
    ///
    /// Month and year steps are computed from the series start, so a
    /// day-of-month clamp (Jan 31 -> Feb 28) does not drift later
    /// occurrences. A hand-set interval of 0 is treated as 1 so position
    /// counting always advances.
    pub fn occurrence_at(&self, start: NaiveDate, n: u32) -> Option<NaiveDate> {
        let steps = n.checked_mul(self.interval.max(1))?;
        match self.frequency {
            Frequency::Daily => start.checked_add_signed(Duration::days(i64::from(steps))),
            Frequency::Weekly => start.checked_add_signed(Duration::days(7 * i64::from(steps))),
            Frequency::Monthly => start.checked_add_months(Months::new(steps)),
            Frequency::Yearly => steps
                .checked_mul(12)
                .and_then(|months| start.checked_add_months(Months::new(months))),
        }
    }

    /// Number of rule positions falling on or before `through`, for a
    /// series starting at `start`.
    ///
    /// Positions are counted against the count/until bounds but not
    /// against `ex_dates`: an excluded occurrence still holds its slot,
    /// matching how the original tracked series duration.
    pub fn occurrences_through(&self, start: NaiveDate, through: NaiveDate) -> u32 {
        let mut n = 0;
        loop {
            if let Some(count) = self.count {
                if n >= count {
                    return n;
                }
            }
            match self.occurrence_at(start, n) {
                Some(date) if date <= through => {
                    if let Some(until) = self.until {
                        if date > until {
                            return n;
                        }
                    }
                    n += 1;
                }
                _ => return n,
            }
        }
    }

    /// The first `max` occurrence dates, honoring bounds and exclusions.
    pub fn occurrence_dates(&self, start: NaiveDate, max: usize) -> Vec<NaiveDate> {
        let mut dates = Vec::new();
        let mut n = 0u32;
        while dates.len() < max {
            if let Some(count) = self.count {
                if n >= count {
                    break;
                }
            }
            let Some(date) = self.occurrence_at(start, n) else {
                break;
            };
            if let Some(until) = self.until {
                if date > until {
                    break;
                }
            }
            if !self.is_ex_date(date) {
                dates.push(date);
            }
            n += 1;
        }
        dates
    }
}
