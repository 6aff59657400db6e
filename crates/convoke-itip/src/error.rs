//! Scheduling error types.

use thiserror::Error;

/// Errors from the external message format collaborator.
///
/// A parse failure is fatal to that single transaction only; calendar
/// state is never touched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The payload could not be parsed at all.
    #[error("malformed scheduling message: {reason}")]
    Malformed { reason: String },

    /// The payload parsed but carries a component kind the core does not
    /// handle.
    #[error("unsupported component: {name}")]
    UnsupportedComponent { name: String },

    /// The method line names no known scheduling method.
    #[error("unknown scheduling method: {name}")]
    UnknownMethod { name: String },
}

/// Errors from the free/busy persistence collaborator.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("free/busy cache failure: {reason}")]
pub struct FreeBusyError {
    pub reason: String,
}

impl FreeBusyError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by message acceptance.
///
/// Graph and scheduling inconsistencies are resolved in place (skip,
/// reject, or warn) and reported through the acceptance outcome; only
/// collaborator failures become errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    /// A free/busy payload arrived but no cache was injected.
    #[error("no free/busy cache configured")]
    MissingFreeBusyCache,

    /// The free/busy cache refused the payload.
    #[error(transparent)]
    FreeBusy(#[from] FreeBusyError),
}
