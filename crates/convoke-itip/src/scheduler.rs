//! The acceptance state machine for inbound scheduling messages.
//!
//! One pure-ish entry point, [`Scheduler::accept`], decides per method
//! whether to create, update, or discard a local entry. Revision plus
//! last-modified time is the sole conflict oracle: the highest-revision,
//! most-recently-edited copy wins, and ties break toward rejecting the
//! inbound copy rather than clobbering a newer local edit.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, error, warn};

use convoke_calendar::{Calendar, InstanceKey};
use convoke_model::{CalTime, Entity, FreeBusy, Incidence, PartStat, Person, canonical_email};

use crate::error::SchedulerError;
use crate::message::{ItipMethod, Message, Outbound};
use crate::ports::{ConfirmationPort, FreeBusyCache};

/// What acceptance did to local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Local state was created, updated, or deleted.
    Applied,
    /// The message lost the conflict resolution; local state untouched.
    Rejected,
    /// The message had nothing to act on, or a human declined it.
    Discarded,
}

/// Result of accepting one message: the outcome plus any messages the
/// pipeline wants sent back out (rejection notices, update broadcasts).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acceptance {
    pub outcome: Outcome,
    pub outbound: Vec<Outbound>,
}

impl Acceptance {
    fn applied() -> Self {
        Self {
            outcome: Outcome::Applied,
            outbound: Vec::new(),
        }
    }

    fn rejected() -> Self {
        Self {
            outcome: Outcome::Rejected,
            outbound: Vec::new(),
        }
    }

    fn discarded() -> Self {
        Self {
            outcome: Outcome::Discarded,
            outbound: Vec::new(),
        }
    }
}

const TARGET_MISSING_QUESTION: &str = "The event, to-do or journal to be updated could not be \
     found. Maybe it has already been deleted, or the calendar that contains it is disabled. \
     Store the update as a new entry, or throw it away?";

const ATTENDEE_ADDED_QUESTION: &str =
    "An attendee was added to the incidence. Do you want to email the attendees an update message?";

/// Accepts inbound scheduling messages against a [`Calendar`].
pub struct Scheduler {
    /// Canonical emails this process answers for. An entry where one of
    /// these is still `NeedsAction` is treated as meant for someone else.
    local_identities: HashSet<String>,
    confirm: Box<dyn ConfirmationPort>,
    freebusy_cache: Option<Box<dyn FreeBusyCache>>,
}

/// Snapshot of a candidate match, taken before any mutation.
struct MatchInfo {
    uid: String,
    recurrence_id: Option<CalTime>,
    revision: u32,
    last_modified: DateTime<Utc>,
    read_only: bool,
    pending_for_me: bool,
}

impl Scheduler {
    /// Creates a scheduler answering for the given identities.
    pub fn new(
        local_identities: impl IntoIterator<Item = impl AsRef<str>>,
        confirm: Box<dyn ConfirmationPort>,
    ) -> Self {
        Self {
            local_identities: local_identities
                .into_iter()
                .map(|email| canonical_email(email.as_ref()))
                .collect(),
            confirm,
            freebusy_cache: None,
        }
    }

    /// Builder: attach a free/busy cache.
    pub fn with_freebusy_cache(mut self, cache: Box<dyn FreeBusyCache>) -> Self {
        self.freebusy_cache = Some(cache);
        self
    }

    fn is_local(&self, email: &str) -> bool {
        self.local_identities.contains(&canonical_email(email))
    }

    /// Accepts one message, mutating `calendar` per the method's policy.
    pub fn accept(
        &mut self,
        calendar: &mut Calendar,
        message: Message,
    ) -> Result<Acceptance, SchedulerError> {
        let Message { method, entity } = message;
        debug!(%method, "accepting scheduling message");
        match (method, entity) {
            (ItipMethod::Publish | ItipMethod::Reply, Entity::FreeBusy(freebusy)) => {
                self.accept_freebusy(method, freebusy)
            }
            // A free/busy request is answered by the presentation layer.
            (_, Entity::FreeBusy(_)) => Ok(Acceptance::discarded()),
            (ItipMethod::Publish, Entity::Incidence(inbound)) => {
                Ok(self.accept_publish(calendar, inbound))
            }
            (ItipMethod::Request, Entity::Incidence(inbound)) => {
                Ok(self.accept_request(calendar, inbound))
            }
            (ItipMethod::Cancel, Entity::Incidence(inbound)) => {
                Ok(self.accept_cancel(calendar, inbound))
            }
            (ItipMethod::Reply, Entity::Incidence(inbound)) => {
                Ok(self.accept_reply(calendar, inbound))
            }
            (
                ItipMethod::Add
                | ItipMethod::Refresh
                | ItipMethod::Counter
                | ItipMethod::DeclineCounter,
                Entity::Incidence(_),
            ) => Ok(Acceptance::discarded()),
        }
    }

    /// Publish: overwrite the local copy when the inbound one is newer.
    fn accept_publish(&self, calendar: &mut Calendar, inbound: Incidence) -> Acceptance {
        let Some(local) = calendar.incidence(&inbound.uid) else {
            debug!(uid = %inbound.uid, "publish for unknown entry");
            return Acceptance::discarded();
        };

        let newer = inbound.revision > local.revision
            || (inbound.revision == local.revision && inbound.last_modified > local.last_modified);
        if !newer {
            debug!(uid = %inbound.uid, "publish is not newer than the local copy");
            return Acceptance::rejected();
        }

        let uid = inbound.uid.clone();
        self.overwrite(calendar, &InstanceKey::base(&uid), inbound)
    }

    /// Request: update the entry the remote party means, or store a new
    /// one under a fresh local uid.
    fn accept_request(&self, calendar: &mut Calendar, mut inbound: Incidence) -> Acceptance {
        let matches = self.snapshot_matches(calendar, &inbound.uid);
        debug!(
            scheduling_id = %inbound.uid,
            matches = matches.len(),
            "request lookup"
        );

        let mut skipped = 0usize;
        for candidate in &matches {
            if candidate.read_only {
                skipped += 1;
                continue;
            }
            if candidate.revision > inbound.revision {
                debug!(uid = %candidate.uid, "local copy has a higher revision");
                return Acceptance::rejected();
            }
            // A match where we have not responded yet is probably a shared
            // copy meant for someone else.
            if candidate.pending_for_me {
                debug!(uid = %candidate.uid, "still needs-action locally; skipping");
                skipped += 1;
                continue;
            }
            if candidate.revision == inbound.revision
                && candidate.last_modified > inbound.last_modified
            {
                debug!(uid = %candidate.uid, "local copy was modified more recently");
                return Acceptance::rejected();
            }

            let key = InstanceKey {
                uid: candidate.uid.clone(),
                recurrence_id: candidate.recurrence_id,
            };
            return self.overwrite(calendar, &key, inbound);
        }

        // No acceptable target. A fresh invitation (revision zero, or no
        // candidates at all) is stored outright; an update whose target
        // was skipped needs a human decision before it becomes a new
        // entry.
        if skipped > 0
            && inbound.revision > 0
            && !self.confirm.ask(TARGET_MISSING_QUESTION)
        {
            return Acceptance::discarded();
        }

        inbound.scheduling_id = Some(inbound.uid.clone());
        inbound.uid = Incidence::create_unique_uid();
        debug!(
            uid = %inbound.uid,
            scheduling_id = ?inbound.scheduling_id,
            "storing new entry"
        );
        if let Err(err) = calendar.add_incidence(inbound) {
            warn!(%err, "could not store inbound entry");
            return Acceptance::rejected();
        }
        Acceptance::applied()
    }

    /// Cancel: delete the first deletable entry the remote party means.
    fn accept_cancel(&self, calendar: &mut Calendar, inbound: Incidence) -> Acceptance {
        let matches = self.snapshot_matches(calendar, &inbound.uid);
        for candidate in &matches {
            if candidate.read_only || candidate.pending_for_me {
                continue;
            }
            return match calendar.delete_incidence(&candidate.uid, candidate.recurrence_id.as_ref())
            {
                Ok(_) => Acceptance::applied(),
                Err(err) => {
                    warn!(uid = %candidate.uid, %err, "cancellation target vanished");
                    Acceptance::rejected()
                }
            };
        }

        // An initial invitation we never stored cancels to nothing; a
        // cancellation of a revised entry that cannot be found is a
        // failure worth surfacing.
        if inbound.revision > 0 {
            warn!(
                scheduling_id = %inbound.uid,
                "entry to be canceled could not be removed; it may be gone already or read-only"
            );
            Acceptance::rejected()
        } else {
            Acceptance::discarded()
        }
    }

    /// Reply: merge attendee responses into the local entry.
    fn accept_reply(&self, calendar: &mut Calendar, inbound: Incidence) -> Acceptance {
        let key = if calendar.incidence(&inbound.uid).is_some() {
            InstanceKey::base(&inbound.uid)
        } else {
            // The reply may address us by the id the remote party knows.
            let found = calendar
                .incidences()
                .into_iter()
                .find(|inc| inc.effective_scheduling_id() == inbound.uid)
                .map(InstanceKey::of);
            match found {
                Some(key) => key,
                None => {
                    error!(uid = %inbound.uid, "no local entry for reply");
                    return Acceptance::discarded();
                }
            }
        };

        let confirm = &*self.confirm;
        let mut outbound: Vec<Outbound> = Vec::new();
        let uid = key.uid.clone();
        let merged = calendar.update_incidence(&uid, key.recurrence_id.as_ref(), |local| {
            let mut changed = false;
            let mut uninvited = Vec::new();

            for reply_attendee in &inbound.attendees {
                if let Some(attendee) = local.attendee_mut_by_email(reply_attendee.email()) {
                    attendee.part_stat = reply_attendee.part_stat;
                    attendee.delegate = reply_attendee.delegate.clone();
                    attendee.delegator = reply_attendee.delegator.clone();
                    changed = true;
                } else if reply_attendee.part_stat != PartStat::Declined {
                    uninvited.push(reply_attendee.clone());
                }
            }

            let mut attendee_added = false;
            for attendee in uninvited {
                let question = match &attendee.delegator {
                    Some(delegator) => format!(
                        "{} wants to attend {} on behalf of {}.",
                        attendee.person.full_name(),
                        local.summary,
                        delegator
                    ),
                    None => format!(
                        "{} wants to attend {} but was not invited.",
                        attendee.person.full_name(),
                        local.summary
                    ),
                };
                if confirm.ask(&question) {
                    local.add_attendee(attendee);
                    changed = true;
                    attendee_added = true;
                } else {
                    let mut notice = inbound.clone();
                    notice.add_comment("The organizer rejected your attendance at this meeting.");
                    outbound.push(Outbound {
                        recipient: Some(attendee.person.full_name()),
                        message: Message::new(ItipMethod::Cancel, notice),
                    });
                }
            }

            if attendee_added {
                local.revision += 1;
                if confirm.ask(ATTENDEE_ADDED_QUESTION) {
                    outbound.push(Outbound {
                        recipient: None,
                        message: Message::new(ItipMethod::Request, local.clone()),
                    });
                }
            }

            // A to-do reply may carry a completion update on its own
            // (RFC 2446 3.4.3).
            if let Some(percent) = inbound.percent_complete() {
                if local.percent_complete() != Some(percent)
                    && local.set_percent_complete(percent)
                {
                    changed = true;
                }
            }

            if changed {
                // Attendee-status merges never bump the revision.
                local.updated();
            }
            changed
        });

        match merged {
            Ok(true) => Acceptance {
                outcome: Outcome::Applied,
                outbound,
            },
            Ok(false) => Acceptance {
                outcome: Outcome::Discarded,
                outbound,
            },
            Err(err) => {
                warn!(%err, "reply target vanished mid-merge");
                Acceptance::rejected()
            }
        }
    }

    /// Free/busy payloads bypass the calendar entirely and go to the
    /// injected cache, keyed by the person the report describes.
    fn accept_freebusy(
        &mut self,
        method: ItipMethod,
        freebusy: FreeBusy,
    ) -> Result<Acceptance, SchedulerError> {
        let Some(cache) = self.freebusy_cache.as_mut() else {
            error!("free/busy payload but no cache configured");
            return Err(SchedulerError::MissingFreeBusyCache);
        };

        let from = match method {
            ItipMethod::Publish => freebusy.organizer.clone(),
            ItipMethod::Reply if freebusy.attendees.len() == 1 => {
                freebusy.attendees[0].person.clone()
            }
            _ => Person::default(),
        };

        cache.save(&freebusy, &from)?;
        Ok(Acceptance::applied())
    }

    /// Snapshots every entry the remote party knows as `scheduling_id`,
    /// before any of them is mutated.
    fn snapshot_matches(&self, calendar: &Calendar, scheduling_id: &str) -> Vec<MatchInfo> {
        calendar
            .incidences_from_scheduling_id(scheduling_id)
            .into_iter()
            .map(|inc| MatchInfo {
                uid: inc.uid.clone(),
                recurrence_id: inc.recurrence_id,
                revision: inc.revision,
                last_modified: inc.last_modified,
                read_only: inc.read_only,
                pending_for_me: inc.attendees.iter().any(|a| {
                    self.is_local(a.email()) && a.part_stat == PartStat::NeedsAction
                }),
            })
            .collect()
    }

    /// Overwrites a stored entry with the inbound one, preserving the
    /// local uid and recording the remote identity.
    fn overwrite(
        &self,
        calendar: &mut Calendar,
        key: &InstanceKey,
        inbound: Incidence,
    ) -> Acceptance {
        let scheduling_id = inbound.uid.clone();
        let result = calendar.update_incidence(&key.uid, key.recurrence_id.as_ref(), |local| {
            if local.assign_from(&inbound) {
                local.scheduling_id = Some(scheduling_id);
                true
            } else {
                false
            }
        });
        match result {
            Ok(true) => Acceptance::applied(),
            Ok(false) => {
                error!(uid = %key.uid, "inbound entry is a different kind; refusing overwrite");
                Acceptance::rejected()
            }
            Err(err) => {
                warn!(uid = %key.uid, %err, "overwrite target vanished");
                Acceptance::rejected()
            }
        }
    }
}
