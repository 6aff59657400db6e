//! Calendar entries: events, to-dos, and journals.
//!
//! [`Incidence`] carries the fields shared by all entry kinds;
//! [`IncidenceKind`] is a closed sum holding the per-kind payload, so
//! everything downstream dispatches with exhaustive `match`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::attendee::{Attendee, Person};
use crate::recurrence::RecurrenceRule;
use crate::time::CalTime;

/// Per-kind payload of a calendar entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IncidenceKind {
    /// An event with an optional end time.
    Event {
        /// When the event ends.
        dtend: Option<CalTime>,
    },
    /// A to-do with an optional due time and completion progress.
    Todo {
        /// When the to-do is due.
        due: Option<CalTime>,
        /// Completion percentage, 0-100.
        percent_complete: u8,
    },
    /// A journal entry.
    Journal,
}

impl IncidenceKind {
    /// Creates an event payload with no end time.
    pub fn event() -> Self {
        Self::Event { dtend: None }
    }

    /// Creates a to-do payload with no due time.
    pub fn todo() -> Self {
        Self::Todo {
            due: None,
            percent_complete: 0,
        }
    }

    /// Returns `true` when both values are the same kind of entry.
    pub fn same_kind(&self, other: &IncidenceKind) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// A calendar entry.
///
/// `uid` is the local identity; `scheduling_id` is the identity the remote
/// party knows the entry by once a scheduling message has assigned it a
/// fresh local uid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incidence {
    /// Locally unique identity.
    pub uid: String,
    /// Identity known to the remote party, when it differs from `uid`.
    pub scheduling_id: Option<String>,
    /// Short description.
    pub summary: String,
    /// Creation timestamp.
    pub created: DateTime<Utc>,
    /// Last modification timestamp.
    pub last_modified: DateTime<Utc>,
    /// Revision number bumped on organizer-visible edits.
    pub revision: u32,
    /// Uid of the parent entry, if any.
    pub related_to: Option<String>,
    /// Occurrence this entry overrides; set only on recurrence exceptions.
    pub recurrence_id: Option<CalTime>,
    /// Primary start time.
    pub dtstart: Option<CalTime>,
    /// The organizer.
    pub organizer: Person,
    /// The attendee list.
    pub attendees: Vec<Attendee>,
    /// Recurrence rule; never set together with `recurrence_id`.
    pub recurrence: Option<RecurrenceRule>,
    /// Entries from read-only sources may not be updated or removed.
    pub read_only: bool,
    /// Free-form comments.
    pub comments: Vec<String>,
    /// Per-kind payload.
    pub kind: IncidenceKind,
}

impl Incidence {
    /// Creates an entry of the given kind.
    pub fn new(kind: IncidenceKind, uid: impl Into<String>, summary: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            uid: uid.into(),
            scheduling_id: None,
            summary: summary.into(),
            created: now,
            last_modified: now,
            revision: 0,
            related_to: None,
            recurrence_id: None,
            dtstart: None,
            organizer: Person::default(),
            attendees: Vec::new(),
            recurrence: None,
            read_only: false,
            comments: Vec::new(),
            kind,
        }
    }

    /// Creates an event.
    pub fn event(uid: impl Into<String>, summary: impl Into<String>) -> Self {
        Self::new(IncidenceKind::event(), uid, summary)
    }

    /// Creates a to-do.
    pub fn todo(uid: impl Into<String>, summary: impl Into<String>) -> Self {
        Self::new(IncidenceKind::todo(), uid, summary)
    }

    /// Creates a journal entry.
    pub fn journal(uid: impl Into<String>, summary: impl Into<String>) -> Self {
        Self::new(IncidenceKind::Journal, uid, summary)
    }

    /// Builder: set the start time.
    pub fn with_dtstart(mut self, dtstart: CalTime) -> Self {
        self.dtstart = Some(dtstart);
        self
    }

    /// Builder: set the organizer.
    pub fn with_organizer(mut self, organizer: Person) -> Self {
        self.organizer = organizer;
        self
    }

    /// Builder: append an attendee.
    pub fn with_attendee(mut self, attendee: Attendee) -> Self {
        self.attendees.push(attendee);
        self
    }

    /// Builder: set the recurrence rule.
    pub fn with_recurrence(mut self, rule: RecurrenceRule) -> Self {
        self.recurrence = Some(rule);
        self
    }

    /// Builder: set the revision.
    pub fn with_revision(mut self, revision: u32) -> Self {
        self.revision = revision;
        self
    }

    /// Builder: set the parent uid.
    pub fn with_related_to(mut self, parent_uid: impl Into<String>) -> Self {
        self.related_to = Some(parent_uid.into());
        self
    }

    /// Builder: set the end boundary (event end or to-do due).
    pub fn with_end_boundary(mut self, end: CalTime) -> Self {
        self.set_end_boundary(Some(end));
        self
    }

    /// Mints a fresh local uid.
    pub fn create_unique_uid() -> String {
        Uuid::new_v4().to_string()
    }

    /// Returns `true` when the entry has an active recurrence rule.
    pub fn recurs(&self) -> bool {
        self.recurrence.is_some()
    }

    /// Returns `true` when the entry overrides a single occurrence of a
    /// recurring series.
    pub fn is_exception(&self) -> bool {
        self.recurrence_id.is_some()
    }

    /// The identity the remote party knows this entry by.
    ///
    /// Defaults to the local uid until a scheduling message records a
    /// divergent one.
    pub fn effective_scheduling_id(&self) -> &str {
        self.scheduling_id.as_deref().unwrap_or(&self.uid)
    }

    /// Gives the entry a brand-new identity: fresh uid, fresh creation
    /// metadata, revision zero, scheduling id dropped.
    pub fn recreate(&mut self) {
        let now = Utc::now();
        self.uid = Self::create_unique_uid();
        self.scheduling_id = None;
        self.created = now;
        self.last_modified = now;
        self.revision = 0;
    }

    /// Records a modification without bumping the revision.
    pub fn updated(&mut self) {
        self.last_modified = Utc::now();
    }

    /// Overwrites this entry with `other`'s fields, preserving the local
    /// `uid` and `recurrence_id`.
    ///
    /// Returns `false` without touching anything when the entries are not
    /// the same kind.
    pub fn assign_from(&mut self, other: &Incidence) -> bool {
        if !self.kind.same_kind(&other.kind) {
            return false;
        }
        let uid = std::mem::take(&mut self.uid);
        let recurrence_id = self.recurrence_id;
        *self = other.clone();
        self.uid = uid;
        self.recurrence_id = recurrence_id;
        true
    }

    /// The end boundary across kinds: event end, to-do due, none for
    /// journals.
    pub fn end_boundary(&self) -> Option<CalTime> {
        match &self.kind {
            IncidenceKind::Event { dtend } => *dtend,
            IncidenceKind::Todo { due, .. } => *due,
            IncidenceKind::Journal => None,
        }
    }

    /// Sets the end boundary; a no-op for journals.
    pub fn set_end_boundary(&mut self, end: Option<CalTime>) {
        match &mut self.kind {
            IncidenceKind::Event { dtend } => *dtend = end,
            IncidenceKind::Todo { due, .. } => *due = end,
            IncidenceKind::Journal => {}
        }
    }

    /// Completion percentage, for to-dos.
    pub fn percent_complete(&self) -> Option<u8> {
        match &self.kind {
            IncidenceKind::Todo {
                percent_complete, ..
            } => Some(*percent_complete),
            _ => None,
        }
    }

    /// Sets the completion percentage on a to-do; `false` for other kinds.
    pub fn set_percent_complete(&mut self, percent: u8) -> bool {
        match &mut self.kind {
            IncidenceKind::Todo {
                percent_complete, ..
            } => {
                *percent_complete = percent.min(100);
                true
            }
            _ => false,
        }
    }

    /// Finds an attendee by canonical email.
    pub fn attendee_by_email(&self, email: &str) -> Option<&Attendee> {
        self.attendees.iter().find(|a| a.matches_email(email))
    }

    /// Finds an attendee by canonical email, mutably.
    pub fn attendee_mut_by_email(&mut self, email: &str) -> Option<&mut Attendee> {
        self.attendees.iter_mut().find(|a| a.matches_email(email))
    }

    /// Appends an attendee.
    pub fn add_attendee(&mut self, attendee: Attendee) {
        self.attendees.push(attendee);
    }

    /// Appends a comment.
    pub fn add_comment(&mut self, comment: impl Into<String>) {
        self.comments.push(comment.into());
    }
}
