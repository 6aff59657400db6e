//! Calendar error types.

use thiserror::Error;

/// Result type for calendar operations.
pub type CalendarResult<T> = Result<T, CalendarError>;

/// Errors that can occur in the calendar aggregate.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CalendarError {
    /// An entry with the same uid and recurrence id already exists.
    #[error("incidence already present: {uid}")]
    DuplicateIncidence { uid: String },

    /// The entry was not found.
    #[error("incidence not found: {uid}")]
    IncidenceNotFound { uid: String },

    /// The operation needs a recurring entry.
    #[error("incidence does not recur: {uid}")]
    NotRecurring { uid: String },

    /// The notebook already exists.
    #[error("notebook already exists: {name}")]
    NotebookExists { name: String },

    /// The notebook does not exist.
    #[error("notebook does not exist: {name}")]
    NotebookMissing { name: String },

    /// Only a base series may change notebooks, not a recurrence
    /// exception.
    #[error("cannot set notebook for recurrence exception: {uid}")]
    ExceptionNotebookMove { uid: String },

    /// The entry must be added to the calendar before it can be placed in
    /// a notebook.
    #[error("incidence not yet added to calendar: {uid}")]
    NotYetAdded { uid: String },
}

impl CalendarError {
    /// Creates a not-found error.
    pub fn not_found(uid: impl Into<String>) -> Self {
        Self::IncidenceNotFound { uid: uid.into() }
    }

    /// Creates a duplicate-incidence error.
    pub fn duplicate(uid: impl Into<String>) -> Self {
        Self::DuplicateIncidence { uid: uid.into() }
    }

    /// Creates a not-recurring error.
    pub fn not_recurring(uid: impl Into<String>) -> Self {
        Self::NotRecurring { uid: uid.into() }
    }
}
