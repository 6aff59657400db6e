//! Collaborator seams the scheduler depends on.
//!
//! The core stays free of wire formats, UI toolkits, and storage; the
//! embedding application injects implementations of these traits.

use convoke_model::{FreeBusy, Person};

use crate::error::{FreeBusyError, ParseError};
use crate::message::Message;

/// Wire-format parser for inbound scheduling payloads.
///
/// The textual grammar is entirely the implementor's business; the core
/// only consumes the parsed [`Message`].
pub trait MessageFormat {
    /// Parses one scheduling message, interpreting floating times in
    /// `calendar_timezone`.
    fn parse_message(&self, calendar_timezone: &str, bytes: &[u8]) -> Result<Message, ParseError>;
}

/// Synchronous human-in-the-loop decision point.
///
/// The scheduler blocks on the answer; a headless embedding can wire in
/// a policy instead of a prompt.
pub trait ConfirmationPort {
    /// Returns `true` to proceed with the described action.
    fn ask(&self, question: &str) -> bool;
}

/// Answers every confirmation the same way. Useful as a fixed policy.
#[derive(Debug, Clone, Copy)]
pub struct AlwaysAnswer(pub bool);

impl ConfirmationPort for AlwaysAnswer {
    fn ask(&self, _question: &str) -> bool {
        self.0
    }
}

/// Persistence for inbound free/busy payloads.
pub trait FreeBusyCache {
    /// Stores `freebusy` keyed by the person it describes.
    fn save(&mut self, freebusy: &FreeBusy, from: &Person) -> Result<(), FreeBusyError>;
}
