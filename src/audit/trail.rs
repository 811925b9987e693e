//! In-memory decision recorder.

use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{DecisionOutcome, DecisionRecord};
use crate::request::NavigationId;

/// Thread-safe in-memory recorder for trust decisions.
///
/// Shadow connections may report from a network thread, so records are
/// kept behind a mutex. Nothing is persisted.
///
/// # Example
///
/// ```
/// use nav_trust::NavigationRequest;
/// use nav_trust::audit::{DecisionOutcome, DecisionRecord, DecisionTrail};
///
/// let trail = DecisionTrail::new();
/// let request = NavigationRequest::parse("https://example.com/").unwrap();
/// # let id = nav_trust::NavigationId::from_raw(7);
///
/// trail.record(DecisionRecord::new(id, &request, DecisionOutcome::Approved));
///
/// assert_eq!(trail.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct DecisionTrail {
    records: Mutex<Vec<DecisionRecord>>,
}

impl DecisionTrail {
    /// Creates a new empty trail.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record.
    pub fn record(&self, record: DecisionRecord) {
        self.lock().push(record);
    }

    /// Returns a snapshot of all records in recording order.
    pub fn records(&self) -> Vec<DecisionRecord> {
        self.lock().clone()
    }

    /// Returns the records of one navigation attempt.
    pub fn for_navigation(&self, id: NavigationId) -> Vec<DecisionRecord> {
        self.lock()
            .iter()
            .filter(|r| r.navigation_id() == id)
            .cloned()
            .collect()
    }

    /// Counts records with the given outcome.
    pub fn count(&self, outcome: DecisionOutcome) -> usize {
        self.lock().iter().filter(|r| r.outcome() == outcome).count()
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Removes all records.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<DecisionRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
