use std::sync::Arc;

use crate::observer::NavigationObserver;
use crate::request::NavigationRequest;

/// The embedded web-rendering surface, implemented by the host.
///
/// The surface owns a single observer slot and delivers navigation events
/// to whatever observer is installed there. When asked to load a request it
/// must report the navigation through
/// [`NavigationObserver::should_start_load`] like any other navigation;
/// this is how an approved navigation is replayed.
pub trait RenderSurface: Send + Sync {
    /// Returns the currently installed observer.
    fn observer(&self) -> Option<Arc<dyn NavigationObserver>>;

    /// Replaces the installed observer.
    fn set_observer(&self, observer: Arc<dyn NavigationObserver>);

    /// Issues `request` as a new top-level navigation.
    ///
    /// The resulting `should_start_load` must carry the same URL, including
    /// scheme, port and query. A replay the interceptor never sees keeps the
    /// surface's pending slot occupied until a navigation to a different
    /// URL starts; that navigation frees the slot, and the lost replay is
    /// recorded as [`ViolationKind::ReplayNotObserved`](crate::ViolationKind::ReplayNotObserved).
    fn load_request(&self, request: NavigationRequest);
}
