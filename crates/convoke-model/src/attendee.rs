//! People on a calendar entry: the organizer and the attendee list.

use serde::{Deserialize, Serialize};

/// Canonical form of an email address used for identity comparison.
///
/// Every merge path compares attendees through this, so matching is
/// uniformly case-insensitive.
pub fn canonical_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// A person referenced by a calendar entry (organizer or attendee).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    /// Display name, possibly empty.
    pub name: String,
    /// Email address; identity for matching purposes.
    pub email: String,
}

impl Person {
    /// Creates a person from a name and email.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// Returns `"Name <email>"`, or just the email when the name is empty.
    pub fn full_name(&self) -> String {
        if self.name.is_empty() {
            self.email.clone()
        } else {
            format!("{} <{}>", self.name, self.email)
        }
    }

    /// Compares by canonical email.
    pub fn matches_email(&self, email: &str) -> bool {
        canonical_email(&self.email) == canonical_email(email)
    }
}

/// An attendee's role on the entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Chair,
    #[default]
    Required,
    Optional,
    NonParticipant,
}

/// An attendee's participation status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartStat {
    /// The attendee has not responded yet.
    #[default]
    NeedsAction,
    Accepted,
    Declined,
    Tentative,
    Delegated,
    /// To-dos only.
    Completed,
    /// To-dos only.
    InProcess,
}

/// An attendee of a calendar entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    /// Who this attendee is.
    pub person: Person,
    /// Role on the entry.
    pub role: Role,
    /// Participation status.
    pub part_stat: PartStat,
    /// Whether a response was requested.
    pub rsvp: bool,
    /// Email of the person this attendee delegated to.
    pub delegate: Option<String>,
    /// Email of the person who delegated to this attendee.
    pub delegator: Option<String>,
}

impl Attendee {
    /// Creates an attendee with default role and status.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            person: Person::new(name, email),
            ..Default::default()
        }
    }

    /// Builder: set the role.
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Builder: set the participation status.
    pub fn with_part_stat(mut self, part_stat: PartStat) -> Self {
        self.part_stat = part_stat;
        self
    }

    /// Builder: request a response.
    pub fn with_rsvp(mut self, rsvp: bool) -> Self {
        self.rsvp = rsvp;
        self
    }

    /// Builder: set the delegator.
    pub fn with_delegator(mut self, delegator: impl Into<String>) -> Self {
        self.delegator = Some(delegator.into());
        self
    }

    /// The attendee's email address.
    pub fn email(&self) -> &str {
        &self.person.email
    }

    /// Compares by canonical email.
    pub fn matches_email(&self, email: &str) -> bool {
        self.person.matches_email(email)
    }
}
