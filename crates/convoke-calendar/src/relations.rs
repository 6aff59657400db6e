//! Parent/child relation tracking.
//!
//! The graph holds uid references only; the calendar owns the entries.
//! Children whose declared parent has not been inserted yet sit in the
//! orphan buffers until the parent shows up. `orphan_uids` mirrors the
//! values of `orphans_by_wanted_parent` and must stay in sync with it.

use std::collections::{HashMap, HashSet};

/// Uid-indexed parent/child edges plus the pending-orphan buffers.
#[derive(Debug, Default)]
pub struct RelationGraph {
    /// Realized parent -> children edges.
    children_of: HashMap<String, Vec<String>>,
    /// wanted-parent uid -> children waiting for it. A key may hold many
    /// children, and a child may sit under a key that no longer matches
    /// its own `related_to` if that field was mutated after insertion.
    orphans_by_wanted_parent: HashMap<String, Vec<String>>,
    /// Membership index over the orphan buckets' values.
    orphan_uids: HashSet<String>,
}

impl RelationGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// The realized children of `parent_uid`.
    pub fn children_of(&self, parent_uid: &str) -> &[String] {
        self.children_of
            .get(parent_uid)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Returns `true` if `uid` is waiting for its parent.
    pub fn is_orphan(&self, uid: &str) -> bool {
        self.orphan_uids.contains(uid)
    }

    /// Adds a realized parent -> child edge.
    pub fn add_child(&mut self, parent_uid: &str, child_uid: impl Into<String>) {
        self.children_of
            .entry(parent_uid.to_string())
            .or_default()
            .push(child_uid.into());
    }

    /// Removes a realized parent -> child edge, if present.
    pub fn remove_child(&mut self, parent_uid: &str, child_uid: &str) {
        if let Some(children) = self.children_of.get_mut(parent_uid) {
            children.retain(|c| c != child_uid);
            if children.is_empty() {
                self.children_of.remove(parent_uid);
            }
        }
    }

    /// Buffers `child_uid` until `wanted_parent` is inserted.
    pub fn add_orphan(&mut self, wanted_parent: &str, child_uid: impl Into<String>) {
        let child_uid = child_uid.into();
        self.orphan_uids.insert(child_uid.clone());
        self.orphans_by_wanted_parent
            .entry(wanted_parent.to_string())
            .or_default()
            .push(child_uid);
    }

    /// Pops every orphan waiting for `parent_uid` and realizes the edges.
    /// Returns the adopted children.
    pub fn adopt_orphans(&mut self, parent_uid: &str) -> Vec<String> {
        let adopted = self
            .orphans_by_wanted_parent
            .remove(parent_uid)
            .unwrap_or_default();
        for child in &adopted {
            self.orphan_uids.remove(child);
            self.children_of
                .entry(parent_uid.to_string())
                .or_default()
                .push(child.clone());
        }
        adopted
    }

    /// Removes `uid` from every orphan bucket that references it.
    ///
    /// The bucket keyed by the entry's own declared parent is the common
    /// case, but `related_to` may have been mutated after the orphan was
    /// buffered, so every bucket whose values mention the uid is rebuilt.
    pub fn purge_orphan(&mut self, uid: &str, declared_parent: Option<&str>) {
        if !self.orphan_uids.remove(uid) {
            return;
        }

        let mut keys: Vec<String> = declared_parent.map(str::to_string).into_iter().collect();
        for (key, bucket) in &self.orphans_by_wanted_parent {
            if bucket.iter().any(|c| c == uid) && !keys.iter().any(|k| k == key) {
                keys.push(key.clone());
            }
        }

        for key in keys {
            if let Some(mut bucket) = self.orphans_by_wanted_parent.remove(&key) {
                bucket.retain(|c| c != uid);
                if !bucket.is_empty() {
                    self.orphans_by_wanted_parent.insert(key, bucket);
                }
            }
        }
    }

    /// Drops the realized edges under `parent_uid`, returning the children.
    pub fn take_children(&mut self, parent_uid: &str) -> Vec<String> {
        self.children_of.remove(parent_uid).unwrap_or_default()
    }

    /// Returns `true` if any realized edge or buffered child references
    /// `uid`.
    ///
    /// Orphan bucket keys are wanted-parent names and may legitimately
    /// name an absent entry, so they are not counted. Used by tests to
    /// assert the no-dangling-relation property.
    pub fn references(&self, uid: &str) -> bool {
        self.orphan_uids.contains(uid)
            || self.children_of.contains_key(uid)
            || self
                .children_of
                .values()
                .chain(self.orphans_by_wanted_parent.values())
                .any(|bucket| bucket.iter().any(|c| c == uid))
    }
}
