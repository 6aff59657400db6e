//! The payload of a scheduling message.

use serde::{Deserialize, Serialize};

use crate::freebusy::FreeBusy;
use crate::incidence::Incidence;

/// What a scheduling message carries: a calendar entry or a free/busy
/// report.
///
/// A closed sum, so the scheduler's dispatch is exhaustive and a new
/// payload kind cannot be silently ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Entity {
    /// An event, to-do, or journal.
    Incidence(Incidence),
    /// A free/busy report.
    FreeBusy(FreeBusy),
}

impl Entity {
    /// Returns the incidence, if this is one.
    pub fn as_incidence(&self) -> Option<&Incidence> {
        match self {
            Self::Incidence(inc) => Some(inc),
            Self::FreeBusy(_) => None,
        }
    }

}

impl From<Incidence> for Entity {
    fn from(inc: Incidence) -> Self {
        Self::Incidence(inc)
    }
}

impl From<FreeBusy> for Entity {
    fn from(fb: FreeBusy) -> Self {
        Self::FreeBusy(fb)
    }
}
