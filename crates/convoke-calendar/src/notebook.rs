//! Notebook bookkeeping: named groupings of entries with a visibility
//! flag.
//!
//! Visibility lookups are memoized per instance; the memo is only ever
//! invalidated wholesale by [`NotebookStore::clear_associations`]. An
//! entry whose notebook is unknown is visible, for backward
//! compatibility.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::calendar::InstanceKey;
use crate::error::{CalendarError, CalendarResult};

/// Notebook names, visibility flags, and entry associations.
#[derive(Debug, Default)]
pub struct NotebookStore {
    /// Notebook name -> visibility.
    notebooks: HashMap<String, bool>,
    /// The default notebook, if one was chosen.
    default_notebook: Option<String>,
    /// Entry uid -> notebook name. Exceptions share their base's uid and
    /// therefore its notebook.
    uid_to_notebook: HashMap<String, String>,
    /// Notebook name -> instance keys it contains.
    notebook_incidences: HashMap<String, Vec<InstanceKey>>,
    /// Memoized per-instance visibility. The store is single-threaded by
    /// contract, so interior mutability keeps `is_visible` a `&self`
    /// lookup.
    visibility: RefCell<HashMap<InstanceKey, bool>>,
}

impl NotebookStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a notebook. Fails if the name is taken.
    pub fn add_notebook(&mut self, name: &str, visible: bool) -> CalendarResult<()> {
        if self.notebooks.contains_key(name) {
            return Err(CalendarError::NotebookExists { name: name.into() });
        }
        self.notebooks.insert(name.to_string(), visible);
        Ok(())
    }

    /// Updates a notebook's visibility. Fails if the notebook is unknown.
    pub fn update_notebook(&mut self, name: &str, visible: bool) -> CalendarResult<()> {
        if !self.notebooks.contains_key(name) {
            return Err(CalendarError::NotebookMissing { name: name.into() });
        }
        self.notebooks.insert(name.to_string(), visible);
        Ok(())
    }

    /// Removes a notebook. Fails if the notebook is unknown.
    pub fn delete_notebook(&mut self, name: &str) -> CalendarResult<()> {
        if self.notebooks.remove(name).is_none() {
            return Err(CalendarError::NotebookMissing { name: name.into() });
        }
        if self.default_notebook.as_deref() == Some(name) {
            self.default_notebook = None;
        }
        Ok(())
    }

    /// Chooses the default notebook. Fails if the notebook is unknown.
    pub fn set_default_notebook(&mut self, name: &str) -> CalendarResult<()> {
        if !self.notebooks.contains_key(name) {
            return Err(CalendarError::NotebookMissing { name: name.into() });
        }
        self.default_notebook = Some(name.to_string());
        Ok(())
    }

    /// The default notebook, if one was chosen.
    pub fn default_notebook(&self) -> Option<&str> {
        self.default_notebook.as_deref()
    }

    /// Returns `true` if the notebook is registered.
    pub fn has_notebook(&self, name: &str) -> bool {
        self.notebooks.contains_key(name)
    }

    /// The notebook an entry belongs to.
    pub fn notebook_of(&self, uid: &str) -> Option<&str> {
        self.uid_to_notebook.get(uid).map(String::as_str)
    }

    /// Notebook names that currently contain entries.
    pub fn notebooks_in_use(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .notebook_incidences
            .keys()
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names
    }

    /// Instance keys associated with a notebook.
    pub fn keys_in_notebook(&self, name: &str) -> &[InstanceKey] {
        self.notebook_incidences
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Associates an instance with a notebook.
    pub fn assign(&mut self, key: InstanceKey, notebook: &str) {
        self.uid_to_notebook
            .insert(key.uid.clone(), notebook.to_string());
        self.notebook_incidences
            .entry(notebook.to_string())
            .or_default()
            .push(key);
    }

    /// Points a uid at a notebook without touching the instance buckets.
    pub fn set_mapping(&mut self, uid: &str, notebook: &str) {
        self.uid_to_notebook
            .insert(uid.to_string(), notebook.to_string());
    }

    /// Moves an instance between notebook buckets without touching the uid
    /// map.
    pub fn move_key(&mut self, key: &InstanceKey, from: &str, to: &str) {
        if let Some(bucket) = self.notebook_incidences.get_mut(from) {
            bucket.retain(|k| k != key);
            if bucket.is_empty() {
                self.notebook_incidences.remove(from);
            }
        }
        self.notebook_incidences
            .entry(to.to_string())
            .or_default()
            .push(key.clone());
    }

    /// Visibility of the entry with this key, memoized.
    ///
    /// An unknown notebook (including no notebook at all) is visible.
    pub fn is_visible(&self, key: &InstanceKey) -> bool {
        if let Some(cached) = self.visibility.borrow().get(key) {
            return *cached;
        }
        let visible = self
            .uid_to_notebook
            .get(&key.uid)
            .and_then(|notebook| self.notebooks.get(notebook).copied())
            .unwrap_or(true);
        self.visibility.borrow_mut().insert(key.clone(), visible);
        visible
    }

    /// Drops all entry associations and the visibility memo. Registered
    /// notebooks survive.
    pub fn clear_associations(&mut self) {
        self.uid_to_notebook.clear();
        self.notebook_incidences.clear();
        self.visibility.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(uid: &str) -> InstanceKey {
        InstanceKey::base(uid)
    }

    #[test]
    fn crud_guards() {
        let mut store = NotebookStore::new();
        store.add_notebook("work", true).unwrap();
        assert_eq!(
            store.add_notebook("work", false),
            Err(CalendarError::NotebookExists { name: "work".into() })
        );
        assert_eq!(
            store.update_notebook("home", true),
            Err(CalendarError::NotebookMissing { name: "home".into() })
        );
        store.update_notebook("work", false).unwrap();
        store.set_default_notebook("work").unwrap();
        assert_eq!(store.default_notebook(), Some("work"));
        store.delete_notebook("work").unwrap();
        assert_eq!(store.default_notebook(), None);
        assert_eq!(
            store.delete_notebook("work"),
            Err(CalendarError::NotebookMissing { name: "work".into() })
        );
    }

    #[test]
    fn unknown_notebook_defaults_to_visible() {
        let store = NotebookStore::new();
        assert!(store.is_visible(&key("a")));
    }

    #[test]
    fn visibility_follows_notebook_flag() {
        let mut store = NotebookStore::new();
        store.add_notebook("hidden", false).unwrap();
        store.assign(key("a"), "hidden");
        assert!(!store.is_visible(&key("a")));
    }

    #[test]
    fn visibility_memo_survives_flag_change_until_cleared() {
        let mut store = NotebookStore::new();
        store.add_notebook("work", true).unwrap();
        store.assign(key("a"), "work");
        assert!(store.is_visible(&key("a")));

        // The memo is only invalidated wholesale.
        store.update_notebook("work", false).unwrap();
        assert!(store.is_visible(&key("a")));

        store.clear_associations();
        // Associations are gone too, so the entry falls back to visible.
        assert!(store.is_visible(&key("a")));
    }

    #[test]
    fn move_key_between_buckets() {
        let mut store = NotebookStore::new();
        store.add_notebook("old", true).unwrap();
        store.add_notebook("new", true).unwrap();
        store.assign(key("a"), "old");
        store.move_key(&key("a"), "old", "new");
        assert!(store.keys_in_notebook("old").is_empty());
        assert_eq!(store.keys_in_notebook("new"), [key("a")]);
    }
}
