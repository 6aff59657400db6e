//! The recurrence-exception engine.
//!
//! Splits a single occurrence, or a tail of occurrences, off a recurring
//! entry. Both functions return the new entry uninserted; insertion and
//! conflict handling stay with the caller. `dissociate_occurrence`
//! additionally mutates the source's rule, so the caller must treat the
//! source as dirty.

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use tracing::warn;

use convoke_model::Incidence;

use crate::error::{CalendarError, CalendarResult};

/// Derives a standalone exception for one occurrence of `source`.
///
/// The result keeps the source's uid, carries `recurrence_id` and a start
/// equal to `recurrence_id`, has fresh creation metadata, revision zero,
/// and no recurrence rule of its own (exceptions never recur further). An
/// end/due boundary on the source is shifted by the occurrence's offset
/// from the original start: whole days for date-only entries, exact
/// seconds for timed ones.
///
/// Tail splits go through [`dissociate_occurrence`]; the
/// `this_and_future` flag is accepted for interface parity but single
/// exceptions are all this derivation produces.
pub fn create_exception(
    source: &Incidence,
    recurrence_id: convoke_model::CalTime,
    _this_and_future: bool,
) -> CalendarResult<Incidence> {
    if !source.recurs() {
        return Err(CalendarError::not_recurring(&source.uid));
    }

    let mut exception = source.clone();
    exception.created = Utc::now();
    exception.last_modified = exception.created;
    exception.revision = 0;
    exception.recurrence = None;
    exception.recurrence_id = Some(recurrence_id);
    exception.dtstart = Some(recurrence_id);

    if let Some(end) = source.end_boundary() {
        if let Some(start) = source.dtstart {
            let shifted = if start.is_date_only() {
                end.shift_days(start.days_to(&recurrence_id))
            } else {
                end.shift_seconds(start.seconds_to(&recurrence_id))
            };
            exception.set_end_boundary(Some(shifted));
        }
    }

    Ok(exception)
}

/// Dissociates one occurrence (or all occurrences from `date` on) from a
/// recurring entry.
///
/// The returned entry is a freestanding clone with a brand-new identity
/// and no `related_to`, so the split piece does not masquerade as a
/// structural child. With `single` its rule is cleared entirely;
/// otherwise the rule's occurrence-count bound is reduced by the
/// occurrences already elapsed strictly before `date`. The clone's start
/// and end/due move forward to `date` by whole days, computed against
/// `tz`.
///
/// As a side effect the source's rule gets `date` as an exclusion date
/// (`single`) or is capped to end the day before `date`.
pub fn dissociate_occurrence<Tz: TimeZone>(
    source: &mut Incidence,
    date: NaiveDate,
    tz: &Tz,
    single: bool,
) -> CalendarResult<Incidence> {
    if !source.recurs() {
        return Err(CalendarError::not_recurring(&source.uid));
    }

    let mut split = source.clone();
    split.recreate();
    split.related_to = None;

    let anchor = split.dtstart.or_else(|| split.end_boundary());

    if single {
        split.recurrence = None;
    } else if let Some(rule) = &mut split.recurrence {
        if let Some(count) = rule.count {
            let start_date = anchor.map(|a| a.date_in(tz)).unwrap_or(date);
            let elapsed = rule.occurrences_through(start_date, date - Duration::days(1));
            if elapsed >= count {
                warn!(
                    uid = %source.uid,
                    count,
                    elapsed,
                    "dissociation point lies beyond the series' own end; clearing rule"
                );
                split.recurrence = None;
            } else {
                rule.set_count(count - elapsed);
            }
        }
    }

    if let Some(anchor) = anchor {
        let days = (date - anchor.date_in(tz)).num_days();
        if let Some(start) = split.dtstart {
            split.dtstart = Some(start.shift_days(days));
        }
        if let Some(end) = split.end_boundary() {
            split.set_end_boundary(Some(end.shift_days(days)));
        }
    }

    if let Some(rule) = &mut source.recurrence {
        if single {
            rule.add_ex_date(date);
        } else {
            rule.cap_until(date - Duration::days(1));
        }
    }
    source.updated();

    Ok(split)
}
