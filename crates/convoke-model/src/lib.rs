//! Entity model: calendar times, attendees, recurrence rules, incidences

pub mod attendee;
pub mod entity;
pub mod freebusy;
pub mod incidence;
pub mod recurrence;
pub mod time;
pub mod tracing;

pub use attendee::{Attendee, PartStat, Person, Role, canonical_email};
pub use entity::Entity;
pub use freebusy::{FreeBusy, FreeBusyPeriod};
pub use incidence::{Incidence, IncidenceKind};
pub use recurrence::{Frequency, RecurrenceRule};
pub use time::CalTime;
pub use self::tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
