//! Relays events to the observer that was installed before the interceptor.

use std::fmt;
use std::sync::Arc;

use crate::observer::{EventKind, NavigationObserver};
use crate::request::{LoadError, NavigationRequest};

/// One navigation event with its borrowed arguments.
#[derive(Debug, Clone, Copy)]
pub enum Event<'a> {
    /// A navigation is about to start
    ShouldStartLoad(&'a NavigationRequest),
    /// Content started loading
    LoadStarted,
    /// Content finished loading
    LoadFinished,
    /// Content failed to load
    LoadFailed(&'a LoadError),
}

impl Event<'_> {
    /// Returns the kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::ShouldStartLoad(_) => EventKind::ShouldStartLoad,
            Event::LoadStarted => EventKind::LoadStarted,
            Event::LoadFinished => EventKind::LoadFinished,
            Event::LoadFailed(_) => EventKind::LoadFailed,
        }
    }
}

/// Forwards events to the original observer if it handles them.
///
/// The original observer is captured once and never reassigned. A surface
/// that had no observer at all gets a proxy that forwards nothing.
#[derive(Clone, Default)]
pub struct ForwardingProxy {
    original: Option<Arc<dyn NavigationObserver>>,
}

impl ForwardingProxy {
    /// Wraps the observer that was installed on the surface, if any.
    pub fn new(original: Option<Arc<dyn NavigationObserver>>) -> Self {
        Self { original }
    }

    /// Returns the wrapped observer.
    pub fn original(&self) -> Option<&Arc<dyn NavigationObserver>> {
        self.original.as_ref()
    }

    /// Returns true if the original observer implements `kind`.
    pub fn supports(&self, kind: EventKind) -> bool {
        self.original
            .as_ref()
            .is_some_and(|observer| observer.handles(kind))
    }

    /// Delivers `event` if the original observer handles it.
    ///
    /// A predicate event is delivered too; its answer is discarded.
    pub fn forward(&self, event: Event<'_>) {
        if let Some(observer) = self.handler_for(event.kind()) {
            tracing::trace!(event = %event.kind(), "forwarding to original observer");
            let _ = dispatch(observer, event);
        }
    }

    /// Delivers `event` and returns the observer's answer, or `default`
    /// when the observer does not handle it.
    ///
    /// # Examples
    ///
    /// ```
    /// use nav_trust::{Event, ForwardingProxy, NavigationRequest};
    ///
    /// let proxy = ForwardingProxy::new(None);
    /// let request = NavigationRequest::parse("https://example.com/").unwrap();
    ///
    /// assert!(proxy.forward_predicate(Event::ShouldStartLoad(&request), true));
    /// assert!(!proxy.forward_predicate(Event::ShouldStartLoad(&request), false));
    /// ```
    pub fn forward_predicate(&self, event: Event<'_>, default: bool) -> bool {
        match self.handler_for(event.kind()) {
            Some(observer) => dispatch(observer, event).unwrap_or(default),
            None => default,
        }
    }

    fn handler_for(&self, kind: EventKind) -> Option<&dyn NavigationObserver> {
        self.original
            .as_deref()
            .filter(|observer| observer.handles(kind))
    }
}

fn dispatch(observer: &dyn NavigationObserver, event: Event<'_>) -> Option<bool> {
    match event {
        Event::ShouldStartLoad(request) => Some(observer.should_start_load(request)),
        Event::LoadStarted => {
            observer.load_started();
            None
        }
        Event::LoadFinished => {
            observer.load_finished();
            None
        }
        Event::LoadFailed(error) => {
            observer.load_failed(error);
            None
        }
    }
}

impl fmt::Debug for ForwardingProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForwardingProxy")
            .field("has_original", &self.original.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::ObserverSlots;
    use std::sync::Mutex;

    fn request(url: &str) -> NavigationRequest {
        NavigationRequest::parse(url).unwrap()
    }

    #[test]
    fn missing_observer_yields_default() {
        let proxy = ForwardingProxy::default();
        let req = request("https://a.test/");

        assert!(!proxy.supports(EventKind::ShouldStartLoad));
        assert!(proxy.forward_predicate(Event::ShouldStartLoad(&req), true));
        proxy.forward(Event::LoadFinished);
    }

    #[test]
    fn predicate_answer_is_returned() {
        let observer = ObserverSlots::new().on_should_start_load(|r| r.host() == Some("ok.test"));
        let proxy = ForwardingProxy::new(Some(Arc::new(observer)));

        assert!(proxy.forward_predicate(Event::ShouldStartLoad(&request("https://ok.test/")), false));
        assert!(!proxy.forward_predicate(Event::ShouldStartLoad(&request("https://no.test/")), true));
    }

    #[test]
    fn unhandled_predicate_is_not_invoked() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        let observer = ObserverSlots::new().on_load_started(move || {
            log.lock().unwrap().push("started");
        });
        let proxy = ForwardingProxy::new(Some(Arc::new(observer)));

        assert!(!proxy.forward_predicate(Event::ShouldStartLoad(&request("https://a.test/")), false));
        assert!(seen.lock().unwrap().is_empty());

        proxy.forward(Event::LoadStarted);
        assert_eq!(*seen.lock().unwrap(), vec!["started"]);
    }

    #[test]
    fn arguments_arrive_unchanged() {
        let seen = Arc::new(Mutex::new(None));
        let slot = seen.clone();
        let observer = ObserverSlots::new().on_load_failed(move |err| {
            *slot.lock().unwrap() = Some(err.clone());
        });
        let proxy = ForwardingProxy::new(Some(Arc::new(observer)));
        let error = LoadError::new(-1202, "untrusted server certificate");

        proxy.forward(Event::LoadFailed(&error));

        assert_eq!(seen.lock().unwrap().as_ref(), Some(&error));
    }
}
