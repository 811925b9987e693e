//! Navigation observers and the closure-slot adapter.
//!
//! The surface notifies exactly one observer. An observer advertises which
//! events it implements through [`NavigationObserver::handles`]; events it
//! does not handle are never delivered to it by the forwarding proxy.

use std::fmt;

use crate::request::{LoadError, NavigationRequest};

/// Navigation lifecycle events a surface can deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A navigation is about to start; the observer may veto it
    ShouldStartLoad,
    /// Content started loading
    LoadStarted,
    /// Content finished loading
    LoadFinished,
    /// Content failed to load
    LoadFailed,
}

impl EventKind {
    /// All event kinds, in lifecycle order.
    pub const ALL: [EventKind; 4] = [
        EventKind::ShouldStartLoad,
        EventKind::LoadStarted,
        EventKind::LoadFinished,
        EventKind::LoadFailed,
    ];
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::ShouldStartLoad => write!(f, "should_start_load"),
            EventKind::LoadStarted => write!(f, "load_started"),
            EventKind::LoadFinished => write!(f, "load_finished"),
            EventKind::LoadFailed => write!(f, "load_failed"),
        }
    }
}

/// Consumer of navigation events from a rendering surface.
///
/// Every callback has a default body so implementers only write the ones
/// they care about, and must say which ones those are in [`handles`].
/// Callbacks take `&self`; observers that need state use interior
/// mutability, since a surface may re-enter its observer while a callback
/// is running.
///
/// [`handles`]: NavigationObserver::handles
pub trait NavigationObserver: Send + Sync {
    /// Returns true if this observer implements `kind`.
    fn handles(&self, kind: EventKind) -> bool;

    /// Returns false to veto the navigation.
    fn should_start_load(&self, request: &NavigationRequest) -> bool {
        let _ = request;
        true
    }

    /// Content started loading.
    fn load_started(&self) {}

    /// Content finished loading.
    fn load_finished(&self) {}

    /// Content failed to load.
    fn load_failed(&self, error: &LoadError) {
        let _ = error;
    }

    /// Returns true only for the trust interceptor itself.
    ///
    /// Used to make installation idempotent.
    fn is_trust_interceptor(&self) -> bool {
        false
    }
}

type Predicate = Box<dyn Fn(&NavigationRequest) -> bool + Send + Sync>;
type Notification = Box<dyn Fn() + Send + Sync>;
type FailureNotification = Box<dyn Fn(&LoadError) + Send + Sync>;

/// Adapts plain closures into a [`NavigationObserver`].
///
/// Each event is an optional slot; an empty slot means the event is not
/// handled.
///
/// # Examples
///
/// ```
/// use nav_trust::{EventKind, NavigationObserver, NavigationRequest, ObserverSlots};
///
/// let observer = ObserverSlots::new()
///     .on_should_start_load(|request| request.host() != Some("ads.example.com"));
///
/// assert!(observer.handles(EventKind::ShouldStartLoad));
/// assert!(!observer.handles(EventKind::LoadFinished));
///
/// let ad = NavigationRequest::parse("https://ads.example.com/").unwrap();
/// assert!(!observer.should_start_load(&ad));
/// ```
#[derive(Default)]
pub struct ObserverSlots {
    should_start_load: Option<Predicate>,
    load_started: Option<Notification>,
    load_finished: Option<Notification>,
    load_failed: Option<FailureNotification>,
}

impl ObserverSlots {
    /// Creates an adapter with every slot empty.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fills the navigation-start predicate slot.
    pub fn on_should_start_load(
        mut self,
        f: impl Fn(&NavigationRequest) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.should_start_load = Some(Box::new(f));
        self
    }

    /// Fills the load-started slot.
    pub fn on_load_started(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.load_started = Some(Box::new(f));
        self
    }

    /// Fills the load-finished slot.
    pub fn on_load_finished(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.load_finished = Some(Box::new(f));
        self
    }

    /// Fills the load-failed slot.
    pub fn on_load_failed(mut self, f: impl Fn(&LoadError) + Send + Sync + 'static) -> Self {
        self.load_failed = Some(Box::new(f));
        self
    }
}

impl NavigationObserver for ObserverSlots {
    fn handles(&self, kind: EventKind) -> bool {
        match kind {
            EventKind::ShouldStartLoad => self.should_start_load.is_some(),
            EventKind::LoadStarted => self.load_started.is_some(),
            EventKind::LoadFinished => self.load_finished.is_some(),
            EventKind::LoadFailed => self.load_failed.is_some(),
        }
    }

    fn should_start_load(&self, request: &NavigationRequest) -> bool {
        self.should_start_load.as_ref().map_or(true, |f| f(request))
    }

    fn load_started(&self) {
        if let Some(f) = &self.load_started {
            f();
        }
    }

    fn load_finished(&self) {
        if let Some(f) = &self.load_finished {
            f();
        }
    }

    fn load_failed(&self, error: &LoadError) {
        if let Some(f) = &self.load_failed {
            f(error);
        }
    }
}

impl fmt::Debug for ObserverSlots {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handled: Vec<EventKind> = EventKind::ALL
            .into_iter()
            .filter(|kind| self.handles(*kind))
            .collect();
        f.debug_struct("ObserverSlots")
            .field("handles", &handled)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn empty_slots_handle_nothing() {
        let slots = ObserverSlots::new();
        for kind in EventKind::ALL {
            assert!(!slots.handles(kind), "{kind} should be unhandled");
        }
        assert!(!slots.is_trust_interceptor());
    }

    #[test]
    fn filled_slots_are_invoked() {
        let count = Arc::new(AtomicUsize::new(0));
        let started = count.clone();
        let failed = count.clone();
        let slots = ObserverSlots::new()
            .on_load_started(move || {
                started.fetch_add(1, Ordering::SeqCst);
            })
            .on_load_failed(move |err| {
                assert_eq!(err.code, -1009);
                failed.fetch_add(10, Ordering::SeqCst);
            });

        slots.load_started();
        slots.load_finished();
        slots.load_failed(&LoadError::new(-1009, "offline"));

        assert_eq!(count.load(Ordering::SeqCst), 11);
        assert!(slots.handles(EventKind::LoadStarted));
        assert!(!slots.handles(EventKind::LoadFinished));
    }

    #[test]
    fn debug_lists_handled_events() {
        let slots = ObserverSlots::new().on_load_finished(|| {});
        assert_eq!(
            format!("{:?}", slots),
            "ObserverSlots { handles: [LoadFinished] }"
        );
    }
}
