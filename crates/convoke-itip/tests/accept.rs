//! End-to-end acceptance behavior for each scheduling method.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use chrono::{DateTime, TimeZone, Utc};

use convoke_calendar::Calendar;
use convoke_itip::{
    Acceptance, AlwaysAnswer, ConfirmationPort, FreeBusyCache, FreeBusyError, ItipMethod, Message,
    Outcome, Scheduler, SchedulerError,
};
use convoke_model::{Attendee, FreeBusy, Incidence, PartStat, Person};

fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
}

/// Answers prompts from a script and records every question asked.
struct ScriptedConfirm {
    answers: RefCell<VecDeque<bool>>,
    asked: Rc<RefCell<Vec<String>>>,
}

impl ScriptedConfirm {
    fn new(answers: impl IntoIterator<Item = bool>) -> (Self, Rc<RefCell<Vec<String>>>) {
        let asked = Rc::new(RefCell::new(Vec::new()));
        (
            Self {
                answers: RefCell::new(answers.into_iter().collect()),
                asked: asked.clone(),
            },
            asked,
        )
    }
}

impl ConfirmationPort for ScriptedConfirm {
    fn ask(&self, question: &str) -> bool {
        self.asked.borrow_mut().push(question.to_string());
        self.answers
            .borrow_mut()
            .pop_front()
            .expect("unexpected confirmation prompt")
    }
}

/// Records saved free/busy payloads for inspection.
#[derive(Clone, Default)]
struct RecordingCache(Rc<RefCell<Vec<(String, usize)>>>);

impl FreeBusyCache for RecordingCache {
    fn save(&mut self, freebusy: &FreeBusy, from: &Person) -> Result<(), FreeBusyError> {
        self.0
            .borrow_mut()
            .push((from.email.clone(), freebusy.periods.len()));
        Ok(())
    }
}

fn scheduler() -> Scheduler {
    Scheduler::new(["me@local.test"], Box::new(AlwaysAnswer(true)))
}

fn accept(scheduler: &mut Scheduler, cal: &mut Calendar, msg: Message) -> Acceptance {
    scheduler.accept(cal, msg).unwrap()
}

mod request {
    use super::*;

    #[test]
    fn unknown_target_is_stored_under_a_fresh_uid() {
        let mut cal = Calendar::new();
        let mut sched = scheduler();
        let inbound = Incidence::event("x", "kickoff").with_revision(3);

        let acc = accept(&mut sched, &mut cal, Message::new(ItipMethod::Request, inbound));
        assert_eq!(acc.outcome, Outcome::Applied);

        let stored = cal.incidences_from_scheduling_id("x");
        assert_eq!(stored.len(), 1);
        assert_ne!(stored[0].uid, "x");
        assert_eq!(stored[0].scheduling_id.as_deref(), Some("x"));
    }

    #[test]
    fn update_overwrites_the_match_and_keeps_the_local_uid() {
        let mut cal = Calendar::new();
        let mut sched = scheduler();

        let invite = Incidence::event("x", "kickoff");
        accept(&mut sched, &mut cal, Message::new(ItipMethod::Request, invite));
        let local_uid = cal.incidences_from_scheduling_id("x")[0].uid.clone();

        let mut update = Incidence::event("x", "kickoff (moved)").with_revision(1);
        update.last_modified = utc(2026, 5, 1, 12, 0, 0);
        let acc = accept(&mut sched, &mut cal, Message::new(ItipMethod::Request, update));

        assert_eq!(acc.outcome, Outcome::Applied);
        let stored = cal.incidence(&local_uid).unwrap();
        assert_eq!(stored.summary, "kickoff (moved)");
        assert_eq!(stored.revision, 1);
        assert_eq!(stored.scheduling_id.as_deref(), Some("x"));
        assert_eq!(cal.len(), 1);
    }

    #[test]
    fn lower_revision_never_mutates_the_local_copy() {
        let mut cal = Calendar::new();
        let mut sched = scheduler();
        let mut local = Incidence::event("local", "planning").with_revision(5);
        local.scheduling_id = Some("x".into());
        cal.add_incidence(local).unwrap();

        let inbound = Incidence::event("x", "planning (stale)").with_revision(3);
        let acc = accept(&mut sched, &mut cal, Message::new(ItipMethod::Request, inbound));

        assert_eq!(acc.outcome, Outcome::Rejected);
        let stored = cal.incidence("local").unwrap();
        assert_eq!(stored.summary, "planning");
        assert_eq!(stored.revision, 5);
        assert_eq!(cal.len(), 1);
    }

    #[test]
    fn equal_revision_with_newer_local_edit_is_rejected() {
        let mut cal = Calendar::new();
        let mut sched = scheduler();
        let mut local = Incidence::event("local", "planning").with_revision(2);
        local.scheduling_id = Some("x".into());
        local.last_modified = utc(2026, 5, 2, 9, 0, 0);
        cal.add_incidence(local).unwrap();

        let mut inbound = Incidence::event("x", "planning (older)").with_revision(2);
        inbound.last_modified = utc(2026, 5, 1, 9, 0, 0);
        let acc = accept(&mut sched, &mut cal, Message::new(ItipMethod::Request, inbound));

        assert_eq!(acc.outcome, Outcome::Rejected);
        assert_eq!(cal.incidence("local").unwrap().summary, "planning");
    }

    #[test]
    fn needs_action_match_asks_before_creating_a_duplicate() {
        let (confirm, asked) = ScriptedConfirm::new([false]);
        let mut sched = Scheduler::new(["me@local.test"], Box::new(confirm));
        let mut cal = Calendar::new();

        // A shared-folder copy we never responded to.
        let mut shared = Incidence::event("shared", "team day")
            .with_attendee(Attendee::new("Me", "me@local.test"));
        shared.scheduling_id = Some("x".into());
        cal.add_incidence(shared).unwrap();

        let inbound = Incidence::event("x", "team day v2").with_revision(2);
        let acc = accept(&mut sched, &mut cal, Message::new(ItipMethod::Request, inbound));

        assert_eq!(acc.outcome, Outcome::Discarded);
        assert_eq!(asked.borrow().len(), 1);
        assert_eq!(cal.len(), 1);
        assert_eq!(cal.incidence("shared").unwrap().summary, "team day");
    }

    #[test]
    fn confirmed_creation_after_skipped_match() {
        let (confirm, _) = ScriptedConfirm::new([true]);
        let mut sched = Scheduler::new(["me@local.test"], Box::new(confirm));
        let mut cal = Calendar::new();

        let mut shared = Incidence::event("shared", "team day")
            .with_attendee(Attendee::new("Me", "me@local.test"));
        shared.scheduling_id = Some("x".into());
        cal.add_incidence(shared).unwrap();

        let inbound = Incidence::event("x", "team day v2").with_revision(2);
        let acc = accept(&mut sched, &mut cal, Message::new(ItipMethod::Request, inbound));

        assert_eq!(acc.outcome, Outcome::Applied);
        assert_eq!(cal.len(), 2);
    }
}

mod publish {
    use super::*;

    #[test]
    fn newer_revision_overwrites_in_place() {
        let mut cal = Calendar::new();
        let mut sched = scheduler();
        cal.add_incidence(Incidence::event("a", "old title")).unwrap();

        let inbound = Incidence::event("a", "new title").with_revision(1);
        let acc = accept(&mut sched, &mut cal, Message::new(ItipMethod::Publish, inbound));

        assert_eq!(acc.outcome, Outcome::Applied);
        let stored = cal.incidence("a").unwrap();
        assert_eq!(stored.summary, "new title");
        assert_eq!(stored.uid, "a");
    }

    #[test]
    fn equal_revision_later_edit_wins() {
        let mut cal = Calendar::new();
        let mut sched = scheduler();
        let mut local = Incidence::event("a", "old title");
        local.last_modified = utc(2026, 5, 1, 9, 0, 0);
        cal.add_incidence(local).unwrap();

        let mut inbound = Incidence::event("a", "new title");
        inbound.last_modified = utc(2026, 5, 1, 10, 0, 0);
        let acc = accept(&mut sched, &mut cal, Message::new(ItipMethod::Publish, inbound));

        assert_eq!(acc.outcome, Outcome::Applied);
        assert_eq!(cal.incidence("a").unwrap().summary, "new title");
    }

    #[test]
    fn stale_publish_is_rejected() {
        let mut cal = Calendar::new();
        let mut sched = scheduler();
        cal.add_incidence(Incidence::event("a", "current").with_revision(4))
            .unwrap();

        let inbound = Incidence::event("a", "stale").with_revision(2);
        let acc = accept(&mut sched, &mut cal, Message::new(ItipMethod::Publish, inbound));

        assert_eq!(acc.outcome, Outcome::Rejected);
        assert_eq!(cal.incidence("a").unwrap().summary, "current");
    }

    #[test]
    fn publish_for_unknown_entry_is_discarded() {
        let mut cal = Calendar::new();
        let mut sched = scheduler();
        let inbound = Incidence::event("ghost", "nothing").with_revision(1);
        let acc = accept(&mut sched, &mut cal, Message::new(ItipMethod::Publish, inbound));
        assert_eq!(acc.outcome, Outcome::Discarded);
        assert!(cal.is_empty());
    }
}

mod cancel {
    use super::*;

    #[test]
    fn cancel_deletes_the_match() {
        let mut cal = Calendar::new();
        let mut sched = scheduler();
        let mut local = Incidence::event("local", "offsite");
        local.scheduling_id = Some("x".into());
        cal.add_incidence(local).unwrap();

        let inbound = Incidence::event("x", "offsite").with_revision(1);
        let acc = accept(&mut sched, &mut cal, Message::new(ItipMethod::Cancel, inbound));

        assert_eq!(acc.outcome, Outcome::Applied);
        assert!(cal.is_empty());
    }

    #[test]
    fn cancel_of_a_revised_unknown_entry_fails() {
        let mut cal = Calendar::new();
        let mut sched = scheduler();
        let inbound = Incidence::event("x", "offsite").with_revision(2);
        let acc = accept(&mut sched, &mut cal, Message::new(ItipMethod::Cancel, inbound));
        assert_eq!(acc.outcome, Outcome::Rejected);
    }

    #[test]
    fn cancel_of_an_initial_invitation_we_never_stored_is_a_noop() {
        let mut cal = Calendar::new();
        let mut sched = scheduler();
        let inbound = Incidence::event("x", "offsite");
        let acc = accept(&mut sched, &mut cal, Message::new(ItipMethod::Cancel, inbound));
        assert_eq!(acc.outcome, Outcome::Discarded);
    }

    #[test]
    fn cancel_skips_copies_still_pending_for_us() {
        let mut cal = Calendar::new();
        let mut sched = scheduler();
        let mut shared = Incidence::event("shared", "team day")
            .with_attendee(Attendee::new("Me", "me@local.test"));
        shared.scheduling_id = Some("x".into());
        cal.add_incidence(shared).unwrap();

        let inbound = Incidence::event("x", "team day").with_revision(1);
        let acc = accept(&mut sched, &mut cal, Message::new(ItipMethod::Cancel, inbound));

        assert_eq!(acc.outcome, Outcome::Rejected);
        assert_eq!(cal.len(), 1);
    }
}

mod reply {
    use super::*;

    #[test]
    fn attendee_status_merges_by_case_insensitive_email() {
        let mut cal = Calendar::new();
        let mut sched = scheduler();
        cal.add_incidence(
            Incidence::event("a", "standup").with_attendee(Attendee::new("Bob", "Bob@X.com")),
        )
        .unwrap();

        let inbound = Incidence::event("a", "standup")
            .with_attendee(Attendee::new("Bob", "bob@x.com").with_part_stat(PartStat::Accepted));
        let acc = accept(&mut sched, &mut cal, Message::new(ItipMethod::Reply, inbound));

        assert_eq!(acc.outcome, Outcome::Applied);
        let stored = cal.incidence("a").unwrap();
        assert_eq!(stored.attendees[0].part_stat, PartStat::Accepted);
        assert_eq!(stored.summary, "standup");
        // Attendee-status merges never bump the revision.
        assert_eq!(stored.revision, 0);
    }

    #[test]
    fn reply_locates_the_entry_by_scheduling_id() {
        let mut cal = Calendar::new();
        let mut sched = scheduler();
        let mut local =
            Incidence::event("local", "standup").with_attendee(Attendee::new("Bob", "bob@x.com"));
        local.scheduling_id = Some("remote".into());
        cal.add_incidence(local).unwrap();

        let inbound = Incidence::event("remote", "standup")
            .with_attendee(Attendee::new("Bob", "bob@x.com").with_part_stat(PartStat::Tentative));
        let acc = accept(&mut sched, &mut cal, Message::new(ItipMethod::Reply, inbound));

        assert_eq!(acc.outcome, Outcome::Applied);
        assert_eq!(
            cal.incidence("local").unwrap().attendees[0].part_stat,
            PartStat::Tentative
        );
    }

    #[test]
    fn rejected_uninvited_attendee_gets_a_cancel_back() {
        let (confirm, asked) = ScriptedConfirm::new([false]);
        let mut sched = Scheduler::new(["me@local.test"], Box::new(confirm));
        let mut cal = Calendar::new();
        cal.add_incidence(Incidence::event("a", "board meeting")).unwrap();

        let inbound = Incidence::event("a", "board meeting")
            .with_attendee(Attendee::new("Eve", "eve@x.com").with_part_stat(PartStat::Accepted));
        let acc = accept(&mut sched, &mut cal, Message::new(ItipMethod::Reply, inbound));

        assert_eq!(acc.outcome, Outcome::Discarded);
        assert!(cal.incidence("a").unwrap().attendees.is_empty());
        assert!(asked.borrow()[0].contains("was not invited"));

        assert_eq!(acc.outbound.len(), 1);
        let out = &acc.outbound[0];
        assert_eq!(out.message.method, ItipMethod::Cancel);
        assert_eq!(out.recipient.as_deref(), Some("Eve <eve@x.com>"));
        let notice = out.message.entity.as_incidence().unwrap();
        assert!(
            notice
                .comments
                .iter()
                .any(|c| c.contains("rejected your attendance"))
        );
    }

    #[test]
    fn accepted_uninvited_attendee_bumps_revision_and_broadcasts() {
        let (confirm, _) = ScriptedConfirm::new([true, true]);
        let mut sched = Scheduler::new(["me@local.test"], Box::new(confirm));
        let mut cal = Calendar::new();
        cal.add_incidence(Incidence::event("a", "board meeting")).unwrap();

        let inbound = Incidence::event("a", "board meeting")
            .with_attendee(Attendee::new("Eve", "eve@x.com").with_part_stat(PartStat::Accepted));
        let acc = accept(&mut sched, &mut cal, Message::new(ItipMethod::Reply, inbound));

        assert_eq!(acc.outcome, Outcome::Applied);
        let stored = cal.incidence("a").unwrap();
        assert_eq!(stored.attendees.len(), 1);
        assert_eq!(stored.revision, 1);

        assert_eq!(acc.outbound.len(), 1);
        assert_eq!(acc.outbound[0].message.method, ItipMethod::Request);
        assert!(acc.outbound[0].recipient.is_none());
    }

    #[test]
    fn declined_unknown_attendee_is_ignored_silently() {
        let mut cal = Calendar::new();
        let mut sched = scheduler();
        cal.add_incidence(Incidence::event("a", "board meeting")).unwrap();

        let inbound = Incidence::event("a", "board meeting")
            .with_attendee(Attendee::new("Eve", "eve@x.com").with_part_stat(PartStat::Declined));
        let acc = accept(&mut sched, &mut cal, Message::new(ItipMethod::Reply, inbound));

        assert_eq!(acc.outcome, Outcome::Discarded);
        assert!(acc.outbound.is_empty());
        assert!(cal.incidence("a").unwrap().attendees.is_empty());
    }

    #[test]
    fn todo_reply_updates_completion() {
        let mut cal = Calendar::new();
        let mut sched = scheduler();
        cal.add_incidence(
            Incidence::todo("t", "report").with_attendee(Attendee::new("Bob", "bob@x.com")),
        )
        .unwrap();

        let mut inbound = Incidence::todo("t", "report")
            .with_attendee(Attendee::new("Bob", "bob@x.com").with_part_stat(PartStat::InProcess));
        inbound.set_percent_complete(60);
        let acc = accept(&mut sched, &mut cal, Message::new(ItipMethod::Reply, inbound));

        assert_eq!(acc.outcome, Outcome::Applied);
        let stored = cal.incidence("t").unwrap();
        assert_eq!(stored.percent_complete(), Some(60));
        assert_eq!(stored.attendees[0].part_stat, PartStat::InProcess);
    }

    #[test]
    fn reply_with_no_local_entry_is_discarded() {
        let mut cal = Calendar::new();
        let mut sched = scheduler();
        let inbound = Incidence::event("ghost", "nothing")
            .with_attendee(Attendee::new("Bob", "bob@x.com").with_part_stat(PartStat::Accepted));
        let acc = accept(&mut sched, &mut cal, Message::new(ItipMethod::Reply, inbound));
        assert_eq!(acc.outcome, Outcome::Discarded);
    }
}

mod freebusy {
    use super::*;

    #[test]
    fn published_report_is_keyed_by_organizer() {
        let cache = RecordingCache::default();
        let saved = cache.0.clone();
        let mut sched = scheduler().with_freebusy_cache(Box::new(cache));
        let mut cal = Calendar::new();

        let report = FreeBusy::new(Person::new("Alice", "alice@x.com"))
            .with_period(utc(2026, 5, 1, 9, 0, 0), utc(2026, 5, 1, 10, 0, 0));
        let acc = accept(&mut sched, &mut cal, Message::new(ItipMethod::Publish, report));

        assert_eq!(acc.outcome, Outcome::Applied);
        assert_eq!(saved.borrow().as_slice(), [("alice@x.com".to_string(), 1)]);
    }

    #[test]
    fn reply_report_is_keyed_by_the_lone_attendee() {
        let cache = RecordingCache::default();
        let saved = cache.0.clone();
        let mut sched = scheduler().with_freebusy_cache(Box::new(cache));
        let mut cal = Calendar::new();

        let report = FreeBusy::new(Person::new("Alice", "alice@x.com"))
            .with_attendee(Attendee::new("Bob", "bob@x.com"));
        let acc = accept(&mut sched, &mut cal, Message::new(ItipMethod::Reply, report));

        assert_eq!(acc.outcome, Outcome::Applied);
        assert_eq!(saved.borrow().as_slice(), [("bob@x.com".to_string(), 0)]);
    }

    #[test]
    fn missing_cache_is_an_error() {
        let mut sched = scheduler();
        let mut cal = Calendar::new();
        let report = FreeBusy::new(Person::new("Alice", "alice@x.com"));
        let err = sched
            .accept(&mut cal, Message::new(ItipMethod::Publish, report))
            .unwrap_err();
        assert_eq!(err, SchedulerError::MissingFreeBusyCache);
    }

    #[test]
    fn freebusy_request_is_left_to_the_presentation_layer() {
        let mut sched = scheduler();
        let mut cal = Calendar::new();
        let report = FreeBusy::new(Person::new("Alice", "alice@x.com"));
        let acc = accept(&mut sched, &mut cal, Message::new(ItipMethod::Request, report));
        assert_eq!(acc.outcome, Outcome::Discarded);
    }
}

mod passthrough {
    use super::*;

    #[test]
    fn add_refresh_counter_and_decline_counter_are_noops() {
        let mut cal = Calendar::new();
        let mut sched = scheduler();
        cal.add_incidence(Incidence::event("a", "standup")).unwrap();

        for method in [
            ItipMethod::Add,
            ItipMethod::Refresh,
            ItipMethod::Counter,
            ItipMethod::DeclineCounter,
        ] {
            let inbound = Incidence::event("a", "mutation attempt").with_revision(9);
            let acc = accept(&mut sched, &mut cal, Message::new(method, inbound));
            assert_eq!(acc.outcome, Outcome::Discarded);
        }
        assert_eq!(cal.incidence("a").unwrap().summary, "standup");
    }
}
