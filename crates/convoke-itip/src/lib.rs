//! Groupware scheduling on top of the in-memory calendar: parsed
//! publish/request/reply/cancel messages go through a per-method
//! acceptance state machine that creates, updates, or discards local
//! entries based on revision numbers and modification times.

pub mod error;
pub mod message;
pub mod ports;
pub mod scheduler;

pub use error::{FreeBusyError, ParseError, SchedulerError};
pub use message::{ItipMethod, Message, Outbound};
pub use ports::{AlwaysAnswer, ConfirmationPort, FreeBusyCache, MessageFormat};
pub use scheduler::{Acceptance, Outcome, Scheduler};
