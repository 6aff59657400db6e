//! The calendar aggregate root.
//!
//! Owns every incidence in an arena keyed by (uid, recurrence id), owns
//! the relation graph and the notebook store, and delivers synchronous
//! observer notifications in mutation order. All other components refer
//! to entries by uid only.
//!
//! Single-threaded by contract: concurrent mutation must be serialized by
//! the embedding application.

use std::collections::HashMap;

use chrono::{NaiveDate, TimeZone};
use tracing::{debug, warn};

use convoke_model::{CalTime, Incidence, IncidenceKind};

use crate::error::{CalendarError, CalendarResult};
use crate::exceptions;
use crate::filter::{AcceptAll, CalFilter};
use crate::notebook::NotebookStore;
use crate::observer::{CalendarObserver, ObserverId};
use crate::relations::RelationGraph;

/// Arena key: uid plus the recurrence id that distinguishes an exception
/// from its base series.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstanceKey {
    /// The entry's uid.
    pub uid: String,
    /// `None` for the base entry, the overridden occurrence for an
    /// exception.
    pub recurrence_id: Option<CalTime>,
}

impl InstanceKey {
    /// Key of a base (non-exception) entry.
    pub fn base(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            recurrence_id: None,
        }
    }

    /// Key of a recurrence exception.
    pub fn exception(uid: impl Into<String>, recurrence_id: CalTime) -> Self {
        Self {
            uid: uid.into(),
            recurrence_id: Some(recurrence_id),
        }
    }

    /// The key under which an entry is stored.
    pub fn of(incidence: &Incidence) -> Self {
        Self {
            uid: incidence.uid.clone(),
            recurrence_id: incidence.recurrence_id,
        }
    }
}

/// The in-memory calendar.
pub struct Calendar {
    incidences: HashMap<InstanceKey, Incidence>,
    relations: RelationGraph,
    notebooks: NotebookStore,
    filter: Box<dyn CalFilter>,
    observers: Vec<(ObserverId, Box<dyn CalendarObserver>)>,
    next_observer_id: u64,
    observers_enabled: bool,
    modified: bool,
    batch_adding: bool,
}

impl Default for Calendar {
    fn default() -> Self {
        Self::new()
    }
}

impl Calendar {
    /// Creates an empty calendar with the accept-all filter.
    pub fn new() -> Self {
        Self {
            incidences: HashMap::new(),
            relations: RelationGraph::new(),
            notebooks: NotebookStore::new(),
            filter: Box::new(AcceptAll),
            observers: Vec::new(),
            next_observer_id: 0,
            observers_enabled: true,
            modified: false,
            batch_adding: false,
        }
    }

    /// Replaces the query filter.
    pub fn set_filter(&mut self, filter: Box<dyn CalFilter>) {
        self.filter = filter;
    }

    // --- observers ---------------------------------------------------

    /// Registers an observer; notifications arrive in registration order.
    pub fn register_observer(&mut self, observer: Box<dyn CalendarObserver>) -> ObserverId {
        let id = ObserverId(self.next_observer_id);
        self.next_observer_id += 1;
        self.observers.push((id, observer));
        id
    }

    /// Unregisters an observer. Returns `false` if the id is unknown.
    pub fn unregister_observer(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(oid, _)| *oid != id);
        self.observers.len() != before
    }

    /// Suppresses or re-enables notifications, e.g. during bulk loads.
    pub fn set_observers_enabled(&mut self, enabled: bool) {
        self.observers_enabled = enabled;
    }

    /// Whether notifications are currently delivered.
    pub fn observers_enabled(&self) -> bool {
        self.observers_enabled
    }

    /// Marks the start of a bulk insert. Advisory: consulted by callers
    /// to skip per-entry destination queries, not enforced here.
    pub fn start_batch_adding(&mut self) {
        self.batch_adding = true;
    }

    /// Marks the end of a bulk insert.
    pub fn end_batch_adding(&mut self) {
        self.batch_adding = false;
    }

    /// Whether a bulk insert is in progress.
    pub fn batch_adding(&self) -> bool {
        self.batch_adding
    }

    /// Sets the modified flag, notifying observers on change.
    pub fn set_modified(&mut self, modified: bool) {
        if modified != self.modified {
            self.modified = modified;
            if self.observers_enabled {
                for (_, observer) in &mut self.observers {
                    observer.calendar_modified(modified);
                }
            }
        }
    }

    /// Whether the calendar has unsaved changes.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    fn notify_added(&mut self, incidence: &Incidence) {
        if self.observers_enabled {
            for (_, observer) in &mut self.observers {
                observer.incidence_added(incidence);
            }
        }
    }

    fn notify_changed(&mut self, incidence: &Incidence) {
        if self.observers_enabled {
            for (_, observer) in &mut self.observers {
                observer.incidence_changed(incidence);
            }
        }
    }

    fn notify_deleted(&mut self, incidence: &Incidence) {
        if self.observers_enabled {
            for (_, observer) in &mut self.observers {
                observer.incidence_deleted(incidence);
            }
        }
    }

    fn notify_add_canceled(&mut self, incidence: &Incidence) {
        if self.observers_enabled {
            for (_, observer) in &mut self.observers {
                observer.incidence_add_canceled(incidence);
            }
        }
    }

    // --- insertion and removal ---------------------------------------

    /// Inserts an entry, realizing its relations.
    ///
    /// A duplicate (uid, recurrence id) is refused with an add-canceled
    /// notification.
    pub fn add_incidence(&mut self, incidence: Incidence) -> CalendarResult<()> {
        let key = InstanceKey::of(&incidence);
        if self.incidences.contains_key(&key) {
            self.notify_add_canceled(&incidence);
            return Err(CalendarError::duplicate(&incidence.uid));
        }

        let snapshot = incidence.clone();
        self.incidences.insert(key.clone(), incidence);
        // An instance of a series that already lives in a notebook joins
        // that notebook's bucket on arrival.
        if let Some(notebook) = self.notebooks.notebook_of(&key.uid).map(str::to_string) {
            self.notebooks.assign(key.clone(), &notebook);
        }
        // Relation edges tie base entries; an exception shares its base's
        // uid and never participates as a separate node.
        if key.recurrence_id.is_none() {
            self.setup_relations(&key.uid);
        }
        self.notify_added(&snapshot);
        self.set_modified(true);
        Ok(())
    }

    /// Deletes an entry, repairing relations first.
    ///
    /// Returns the removed entry with its own `related_to` cleared, so a
    /// deleted entry never keeps a link to a survivor.
    pub fn delete_incidence(
        &mut self,
        uid: &str,
        recurrence_id: Option<&CalTime>,
    ) -> CalendarResult<Incidence> {
        let key = InstanceKey {
            uid: uid.to_string(),
            recurrence_id: recurrence_id.copied(),
        };
        let Some(mut removed) = self.incidences.remove(&key) else {
            return Err(CalendarError::not_found(uid));
        };
        if key.recurrence_id.is_none() {
            self.remove_relations(uid, removed.related_to.as_deref());
        }
        removed.related_to = None;
        self.notify_deleted(&removed);
        self.set_modified(true);
        Ok(removed)
    }

    // --- lookup -------------------------------------------------------

    /// The base entry with this uid.
    pub fn incidence(&self, uid: &str) -> Option<&Incidence> {
        self.incidences.get(&InstanceKey::base(uid))
    }

    /// The exception with this uid and recurrence id.
    pub fn incidence_with_recurrence_id(
        &self,
        uid: &str,
        recurrence_id: &CalTime,
    ) -> Option<&Incidence> {
        self.incidences
            .get(&InstanceKey::exception(uid, *recurrence_id))
    }

    /// Every exception of the series with this uid.
    pub fn instances(&self, uid: &str) -> Vec<&Incidence> {
        let mut items: Vec<&Incidence> = self
            .incidences
            .values()
            .filter(|inc| inc.uid == uid && inc.recurrence_id.is_some())
            .collect();
        items.sort_by(|a, b| a.recurrence_id.cmp(&b.recurrence_id));
        items
    }

    /// Every entry, base and exception, ordered by uid.
    pub fn incidences(&self) -> Vec<&Incidence> {
        let mut items: Vec<&Incidence> = self.incidences.values().collect();
        items.sort_by(|a, b| {
            a.uid
                .cmp(&b.uid)
                .then_with(|| a.recurrence_id.cmp(&b.recurrence_id))
        });
        items
    }

    /// Entries the remote party knows under `scheduling_id`.
    ///
    /// An entry whose scheduling id was never set matches on its uid, as
    /// the scheduling id defaults to the uid.
    pub fn incidences_from_scheduling_id(&self, scheduling_id: &str) -> Vec<&Incidence> {
        let mut items: Vec<&Incidence> = self
            .incidences
            .values()
            .filter(|inc| inc.effective_scheduling_id() == scheduling_id)
            .collect();
        items.sort_by(|a, b| {
            a.uid
                .cmp(&b.uid)
                .then_with(|| a.recurrence_id.cmp(&b.recurrence_id))
        });
        items
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.incidences.len()
    }

    /// Whether the calendar holds no entries.
    pub fn is_empty(&self) -> bool {
        self.incidences.is_empty()
    }

    // --- mutation ------------------------------------------------------

    /// Mutates an entry in place and notifies observers of the change.
    pub fn update_incidence<R>(
        &mut self,
        uid: &str,
        recurrence_id: Option<&CalTime>,
        f: impl FnOnce(&mut Incidence) -> R,
    ) -> CalendarResult<R> {
        let key = InstanceKey {
            uid: uid.to_string(),
            recurrence_id: recurrence_id.copied(),
        };
        let Some(incidence) = self.incidences.get_mut(&key) else {
            return Err(CalendarError::not_found(uid));
        };
        let result = f(incidence);
        let snapshot = incidence.clone();
        self.notify_changed(&snapshot);
        self.set_modified(true);
        Ok(result)
    }

    // --- relations -----------------------------------------------------

    /// Realized children of the entry with this uid.
    pub fn relations(&self, uid: &str) -> &[String] {
        self.relations.children_of(uid)
    }

    /// Returns `true` if `uid` is still waiting for its parent.
    pub fn is_orphan(&self, uid: &str) -> bool {
        self.relations.is_orphan(uid)
    }

    /// Returns `true` if `ancestor_uid` is reachable from `uid` by
    /// following `related_to` edges upward.
    ///
    /// Terminates because cycles are rejected at link time.
    pub fn is_ancestor_of(&self, ancestor_uid: &str, uid: &str) -> bool {
        let mut current = uid.to_string();
        loop {
            let Some(incidence) = self.incidence(&current) else {
                return false;
            };
            match &incidence.related_to {
                None => return false,
                Some(parent) if parent == ancestor_uid => return true,
                Some(parent) => current = parent.clone(),
            }
        }
    }

    /// Links a freshly inserted entry into the relation graph.
    ///
    /// Adopts any orphans waiting for it, then links it under its own
    /// parent: realized edge if the parent is present and acyclic, orphan
    /// buffer if the parent is missing. A link that would close a cycle
    /// is refused by clearing the entry's `related_to`.
    fn setup_relations(&mut self, uid: &str) {
        let adopted = self.relations.adopt_orphans(uid);
        if !adopted.is_empty() {
            debug!(parent = %uid, children = adopted.len(), "adopted orphans");
        }

        let Some(parent_uid) = self
            .incidence(uid)
            .and_then(|inc| inc.related_to.clone())
        else {
            return;
        };

        if self.incidence(&parent_uid).is_some() {
            if self.is_ancestor_of(uid, &parent_uid) {
                warn!(child = %uid, parent = %parent_uid, "hierarchy loop; clearing relation");
                if let Some(incidence) = self.incidences.get_mut(&InstanceKey::base(uid)) {
                    incidence.related_to = None;
                }
            } else {
                self.relations.add_child(&parent_uid, uid);
            }
        } else {
            self.relations.add_orphan(&parent_uid, uid);
        }
    }

    /// Unlinks a removed entry.
    ///
    /// Surviving children move to the orphan buffers keyed by the deleted
    /// uid, with their `related_to` rewritten so they remember what they
    /// are waiting for. The deleted entry is dropped from its parent's
    /// edge and purged from every orphan bucket that references it.
    fn remove_relations(&mut self, uid: &str, declared_parent: Option<&str>) {
        for child in self.relations.take_children(uid) {
            if !self.relations.is_orphan(&child) {
                self.relations.add_orphan(uid, child.clone());
                if let Some(incidence) = self.incidences.get_mut(&InstanceKey::base(&child)) {
                    incidence.related_to = Some(uid.to_string());
                }
            }
        }

        if let Some(parent) = declared_parent {
            self.relations.remove_child(parent, uid);
        }
        self.relations.purge_orphan(uid, declared_parent);
    }

    /// Test hook: whether any relation structure references `uid`.
    pub fn relation_references(&self, uid: &str) -> bool {
        self.relations.references(uid)
    }

    // --- recurrence exceptions ----------------------------------------

    /// Derives an uninserted exception for one occurrence of the series
    /// with this uid. See [`exceptions::create_exception`].
    pub fn create_exception(
        &self,
        uid: &str,
        recurrence_id: CalTime,
        this_and_future: bool,
    ) -> CalendarResult<Incidence> {
        let source = self.incidence(uid).ok_or_else(|| CalendarError::not_found(uid))?;
        exceptions::create_exception(source, recurrence_id, this_and_future)
    }

    /// Splits an occurrence (or tail) off the series with this uid,
    /// mutating the stored source. The split entry is returned uninserted.
    /// See [`exceptions::dissociate_occurrence`].
    pub fn dissociate_occurrence<Tz: TimeZone>(
        &mut self,
        uid: &str,
        date: NaiveDate,
        tz: &Tz,
        single: bool,
    ) -> CalendarResult<Incidence> {
        let key = InstanceKey::base(uid);
        let Some(source) = self.incidences.get_mut(&key) else {
            return Err(CalendarError::not_found(uid));
        };
        let split = exceptions::dissociate_occurrence(source, date, tz, single)?;
        let snapshot = source.clone();
        self.notify_changed(&snapshot);
        self.set_modified(true);
        Ok(split)
    }

    // --- notebooks -----------------------------------------------------

    /// Registers a notebook.
    pub fn add_notebook(&mut self, name: &str, visible: bool) -> CalendarResult<()> {
        self.notebooks.add_notebook(name, visible)
    }

    /// Updates a notebook's visibility.
    pub fn update_notebook(&mut self, name: &str, visible: bool) -> CalendarResult<()> {
        self.notebooks.update_notebook(name, visible)
    }

    /// Removes a notebook.
    pub fn delete_notebook(&mut self, name: &str) -> CalendarResult<()> {
        self.notebooks.delete_notebook(name)
    }

    /// Chooses the default notebook.
    pub fn set_default_notebook(&mut self, name: &str) -> CalendarResult<()> {
        self.notebooks.set_default_notebook(name)
    }

    /// The default notebook, if one was chosen.
    pub fn default_notebook(&self) -> Option<&str> {
        self.notebooks.default_notebook()
    }

    /// Returns `true` if the notebook is registered.
    pub fn has_notebook(&self, name: &str) -> bool {
        self.notebooks.has_notebook(name)
    }

    /// The notebook an entry belongs to.
    pub fn notebook_of(&self, uid: &str) -> Option<&str> {
        self.notebooks.notebook_of(uid)
    }

    /// Notebook names that currently contain entries.
    pub fn notebooks_in_use(&self) -> Vec<&str> {
        self.notebooks.notebooks_in_use()
    }

    /// Entries associated with a notebook, in storage order.
    pub fn incidences_in_notebook(&self, name: &str) -> Vec<&Incidence> {
        self.notebooks
            .keys_in_notebook(name)
            .iter()
            .filter_map(|key| self.incidences.get(key))
            .collect()
    }

    /// Places a series in a notebook, moving all its instances together.
    ///
    /// Only the base series may change notebooks; addressing an exception
    /// is refused. The entry must already be in the calendar.
    pub fn set_notebook(
        &mut self,
        uid: &str,
        recurrence_id: Option<&CalTime>,
        notebook: &str,
    ) -> CalendarResult<()> {
        if recurrence_id.is_some() {
            return Err(CalendarError::ExceptionNotebookMove { uid: uid.into() });
        }
        let Some(snapshot) = self.incidence(uid).cloned() else {
            return Err(CalendarError::NotYetAdded { uid: uid.into() });
        };

        let old = self.notebooks.notebook_of(uid).map(str::to_string);
        match old {
            Some(ref old_name) if old_name == notebook => Ok(()),
            Some(ref old_name) => {
                // Move the base and every recurrence instance as one step.
                let keys: Vec<InstanceKey> = self
                    .incidences
                    .keys()
                    .filter(|k| k.uid == uid)
                    .cloned()
                    .collect();
                for key in &keys {
                    self.notebooks.move_key(key, old_name, notebook);
                }
                self.notebooks.set_mapping(uid, notebook);
                self.notify_changed(&snapshot);
                Ok(())
            }
            None => {
                // Same shape as the move branch: the base and every stored
                // recurrence instance land in the bucket together.
                let keys: Vec<InstanceKey> = self
                    .incidences
                    .keys()
                    .filter(|k| k.uid == uid)
                    .cloned()
                    .collect();
                for key in keys {
                    self.notebooks.assign(key, notebook);
                }
                self.notify_changed(&snapshot);
                Ok(())
            }
        }
    }

    /// Visibility of an entry, per its notebook. Memoized; see
    /// [`Calendar::clear_notebook_associations`].
    pub fn is_visible(&self, incidence: &Incidence) -> bool {
        self.notebooks.is_visible(&InstanceKey::of(incidence))
    }

    /// Drops all notebook associations and the visibility memo.
    pub fn clear_notebook_associations(&mut self) {
        self.notebooks.clear_associations();
    }

    // --- queries -------------------------------------------------------

    /// Visible events, after the filter.
    pub fn events(&self) -> Vec<&Incidence> {
        self.query(|inc| matches!(inc.kind, IncidenceKind::Event { .. }))
    }

    /// Visible to-dos, after the filter.
    pub fn todos(&self) -> Vec<&Incidence> {
        self.query(|inc| matches!(inc.kind, IncidenceKind::Todo { .. }))
    }

    /// Visible journals, after the filter.
    pub fn journals(&self) -> Vec<&Incidence> {
        self.query(|inc| matches!(inc.kind, IncidenceKind::Journal))
    }

    /// Raw kind query narrowed by notebook visibility, then handed to the
    /// injected filter exactly once.
    fn query(&self, pred: impl Fn(&Incidence) -> bool) -> Vec<&Incidence> {
        let mut items: Vec<&Incidence> = self
            .incidences
            .iter()
            .filter(|(key, inc)| pred(inc) && self.notebooks.is_visible(key))
            .map(|(_, inc)| inc)
            .collect();
        items.sort_by(|a, b| {
            a.uid
                .cmp(&b.uid)
                .then_with(|| a.recurrence_id.cmp(&b.recurrence_id))
        });
        self.filter.apply(&mut items);
        items
    }
}
