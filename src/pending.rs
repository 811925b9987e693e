//! The single pending-navigation slot of one surface.
//!
//! ```text
//! empty --claim--> evaluating --approve--> approved --begin_replay--> replaying
//!                       |                                                 |
//!                       +--release--> empty            empty <--take_replay--+
//!                                                      empty <--evict_unmatched_replay
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{Violation, ViolationKind};
use crate::request::{NavigationId, NavigationRequest};

/// A navigation that is being evaluated or waiting to be replayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingNavigation {
    /// Id of the navigation attempt
    pub id: NavigationId,
    /// The request that was blocked
    pub request: NavigationRequest,
    /// Set once approved; the next matching start is waved through
    pub suppress_policy_check: bool,
    /// Set once the request was handed back to the surface
    pub replay_issued: bool,
}

/// Holds at most one [`PendingNavigation`].
#[derive(Debug, Default)]
pub(crate) struct PendingSlot {
    inner: Mutex<Option<PendingNavigation>>,
}

impl PendingSlot {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `request` as the navigation under evaluation.
    ///
    /// # Errors
    ///
    /// Returns a [`ViolationKind::ConcurrentNavigation`] violation if the
    /// slot is already occupied. The occupant is left untouched.
    pub fn claim(&self, request: &NavigationRequest) -> Result<NavigationId, Violation> {
        let mut slot = self.lock();
        if let Some(current) = slot.as_ref() {
            return Err(Violation::new(
                ViolationKind::ConcurrentNavigation,
                format!("{} is still awaiting a trust decision", current.id),
            ));
        }
        let id = NavigationId::next();
        *slot = Some(PendingNavigation {
            id,
            request: request.clone(),
            suppress_policy_check: false,
            replay_issued: false,
        });
        Ok(id)
    }

    /// Marks navigation `id` as approved.
    ///
    /// Returns true only for the call that performed the transition.
    pub fn approve(&self, id: NavigationId) -> bool {
        match self.lock().as_mut() {
            Some(pending) if pending.id == id && !pending.suppress_policy_check => {
                pending.suppress_policy_check = true;
                true
            }
            _ => false,
        }
    }

    /// Marks approved navigation `id` as being replayed and returns its
    /// request.
    ///
    /// Returns `None` if `id` is not approved or its replay was already
    /// issued, so each navigation is replayed at most once.
    pub fn begin_replay(&self, id: NavigationId) -> Option<NavigationRequest> {
        match self.lock().as_mut() {
            Some(pending)
                if pending.id == id && pending.suppress_policy_check && !pending.replay_issued =>
            {
                pending.replay_issued = true;
                Some(pending.request.clone())
            }
            _ => None,
        }
    }

    /// Consumes the slot if it holds an approved navigation to the same
    /// target as `request`.
    pub fn take_replay(&self, request: &NavigationRequest) -> Option<NavigationId> {
        let mut slot = self.lock();
        let is_replay = slot
            .as_ref()
            .is_some_and(|pending| pending.suppress_policy_check && pending.request.same_target(request));
        if is_replay {
            slot.take().map(|pending| pending.id)
        } else {
            None
        }
    }

    /// Empties the slot if its replay was issued but a navigation to some
    /// other target starts instead.
    ///
    /// The surface has moved on without reporting the replay (it rewrote
    /// the URL or ignored the load), so the slot would otherwise stay
    /// occupied forever.
    pub fn evict_unmatched_replay(&self, request: &NavigationRequest) -> Option<PendingNavigation> {
        let mut slot = self.lock();
        let stale = slot
            .as_ref()
            .is_some_and(|pending| pending.replay_issued && !pending.request.same_target(request));
        if stale {
            slot.take()
        } else {
            None
        }
    }

    /// Empties the slot if it still belongs to navigation `id`.
    pub fn release(&self, id: NavigationId) -> bool {
        let mut slot = self.lock();
        if slot.as_ref().is_some_and(|pending| pending.id == id) {
            *slot = None;
            true
        } else {
            false
        }
    }

    /// Returns a copy of the current occupant.
    pub fn current(&self) -> Option<PendingNavigation> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Option<PendingNavigation>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
