//! In-memory calendar: an arena of incidences with relation tracking,
//! notebook visibility, recurrence-exception handling, and synchronous
//! change notifications.

pub mod calendar;
pub mod error;
pub mod exceptions;
pub mod filter;
pub mod notebook;
pub mod observer;
pub mod relations;

pub use calendar::{Calendar, InstanceKey};
pub use error::{CalendarError, CalendarResult};
pub use exceptions::{create_exception, dissociate_occurrence};
pub use filter::{AcceptAll, CalFilter, HideCompletedTodos};
pub use notebook::NotebookStore;
pub use observer::{CalendarObserver, ObserverId};
pub use relations::RelationGraph;
