//! The query filter seam.
//!
//! The embedding application injects a [`CalFilter`]; the calendar applies
//! it exactly once per query method, after notebook visibility.

use convoke_model::{Incidence, IncidenceKind};

/// Narrows query results to the entries the application wants shown.
pub trait CalFilter {
    /// Removes unwanted entries from `incidences` in place.
    fn apply<'a>(&self, incidences: &mut Vec<&'a Incidence>);
}

/// The default filter: keeps everything.
#[derive(Debug, Default)]
pub struct AcceptAll;

impl CalFilter for AcceptAll {
    fn apply<'a>(&self, _incidences: &mut Vec<&'a Incidence>) {}
}

/// Hides to-dos that are fully complete.
#[derive(Debug, Default)]
pub struct HideCompletedTodos;

impl CalFilter for HideCompletedTodos {
    fn apply<'a>(&self, incidences: &mut Vec<&'a Incidence>) {
        incidences.retain(|inc| match &inc.kind {
            IncidenceKind::Todo {
                percent_complete, ..
            } => *percent_complete < 100,
            _ => true,
        });
    }
}
