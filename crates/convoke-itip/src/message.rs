//! Scheduling messages: a method plus the entity it carries.

use std::fmt;

use serde::{Deserialize, Serialize};

use convoke_model::Entity;

/// The scheduling method of an inbound or outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItipMethod {
    /// Unsolicited posting of an entry.
    Publish,
    /// Invitation, or an update to an earlier invitation.
    Request,
    /// Attendee response to a request.
    Reply,
    /// Addition of occurrences to an existing entry.
    Add,
    /// Withdrawal of an entry.
    Cancel,
    /// Attendee asks the organizer for the latest copy.
    Refresh,
    /// Attendee proposes a change.
    Counter,
    /// Organizer declines a counter-proposal.
    DeclineCounter,
}

impl ItipMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Publish => "PUBLISH",
            Self::Request => "REQUEST",
            Self::Reply => "REPLY",
            Self::Add => "ADD",
            Self::Cancel => "CANCEL",
            Self::Refresh => "REFRESH",
            Self::Counter => "COUNTER",
            Self::DeclineCounter => "DECLINECOUNTER",
        }
    }
}

impl fmt::Display for ItipMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed scheduling message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub method: ItipMethod,
    pub entity: Entity,
}

impl Message {
    pub fn new(method: ItipMethod, entity: impl Into<Entity>) -> Self {
        Self {
            method,
            entity: entity.into(),
        }
    }
}

/// A message the acceptance pipeline wants sent back out.
///
/// `recipient` is `None` for a broadcast to the entry's attendee list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outbound {
    pub recipient: Option<String>,
    pub message: Message,
}
