//! Free/busy payloads.
//!
//! The core does not interpret free/busy data; it only routes it to the
//! cache collaborator keyed by the person it describes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::attendee::{Attendee, Person};

/// A single busy period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeBusyPeriod {
    /// Start of the busy period.
    pub start: DateTime<Utc>,
    /// End of the busy period.
    pub end: DateTime<Utc>,
}

/// A free/busy report carried by a scheduling message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeBusy {
    /// Whose calendar the report describes (for published reports).
    pub organizer: Person,
    /// Attendees; a reply carries exactly one.
    pub attendees: Vec<Attendee>,
    /// The busy periods.
    pub periods: Vec<FreeBusyPeriod>,
}

impl FreeBusy {
    /// Creates an empty report for the given organizer.
    pub fn new(organizer: Person) -> Self {
        Self {
            organizer,
            ..Default::default()
        }
    }

    /// Builder: append an attendee.
    pub fn with_attendee(mut self, attendee: Attendee) -> Self {
        self.attendees.push(attendee);
        self
    }

    /// Builder: append a busy period.
    pub fn with_period(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.periods.push(FreeBusyPeriod { start, end });
        self
    }
}
