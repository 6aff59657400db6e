//! Calendar change notifications.

use convoke_model::Incidence;

/// Identifies a registered observer so it can be unregistered later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(pub(crate) u64);

/// Receives synchronous notifications about calendar mutations, in the
/// order the mutating calls occur.
///
/// All methods default to no-ops so observers implement only what they
/// care about.
pub trait CalendarObserver {
    /// The calendar's modified flag changed.
    fn calendar_modified(&mut self, modified: bool) {
        let _ = modified;
    }

    /// An entry was inserted.
    fn incidence_added(&mut self, incidence: &Incidence) {
        let _ = incidence;
    }

    /// An entry was changed in place.
    fn incidence_changed(&mut self, incidence: &Incidence) {
        let _ = incidence;
    }

    /// An entry was deleted.
    fn incidence_deleted(&mut self, incidence: &Incidence) {
        let _ = incidence;
    }

    /// An insertion was refused (duplicate key).
    fn incidence_add_canceled(&mut self, incidence: &Incidence) {
        let _ = incidence;
    }
}
