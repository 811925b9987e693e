//! The navigation interceptor and its installation.
//!
//! # Decision protocol
//!
//! ```text
//! should_start_load(request)
//!   ├─ approved replay pending for this URL? ── consume, allow
//!   ├─ replay issued for another URL? ───────── evict it, carry on
//!   ├─ ask original observer (default: allow)
//!   ├─ no trust policy ──────────────────────── return its answer
//!   ├─ observer said no ─────────────────────── block
//!   └─ claim pending slot, start evaluator ──── block (replayed later)
//! ```

use std::fmt;
use std::sync::Arc;

use tokio::runtime::Handle;

use crate::audit::{DecisionOutcome, DecisionRecord, DecisionTrail};
use crate::error::{Error, ViolationKind};
use crate::evaluator::TrustEvaluator;
use crate::forwarding::{Event, ForwardingProxy};
use crate::logging::NavigationLog;
use crate::observer::{EventKind, NavigationObserver};
use crate::pending::{PendingNavigation, PendingSlot};
use crate::policy::TrustPolicy;
use crate::request::{LoadError, NavigationId, NavigationRequest};
use crate::shadow::ShadowConnector;
use crate::surface::RenderSurface;
use crate::tls::{TlsConfig, TlsShadowConnector};

/// Result of installing the interceptor on a surface.
#[derive(Debug, Clone)]
pub enum Installation {
    /// A new interceptor now observes the surface
    Installed(Arc<NavigationInterceptor>),
    /// The surface already had an interceptor; nothing changed
    AlreadyInstalled,
}

impl Installation {
    /// Returns the new interceptor, if one was installed.
    pub fn interceptor(&self) -> Option<&Arc<NavigationInterceptor>> {
        match self {
            Installation::Installed(interceptor) => Some(interceptor),
            Installation::AlreadyInstalled => None,
        }
    }
}

/// Gates every top-level navigation of one surface behind an optional
/// trust decision.
///
/// Without a trust policy the interceptor is invisible: every event,
/// including the navigation-start predicate, reaches the original observer
/// unchanged.
///
/// # Known limitation
///
/// When the policy rejects a navigation it is dropped silently. The
/// original observer sees neither a load failure nor any other event, so
/// the surface simply stays where it was. Attach a
/// [`DecisionTrail`](crate::audit::DecisionTrail) to find out about drops.
///
/// The evaluator and the pending slot are owned by the interceptor and
/// cannot be built on their own:
///
/// ```compile_fail
/// let slot = nav_trust::PendingSlot::new();
/// ```
///
/// ```compile_fail
/// fn evaluate(evaluator: &nav_trust::TrustEvaluator) {}
/// ```
pub struct NavigationInterceptor {
    proxy: ForwardingProxy,
    evaluator: Option<TrustEvaluator>,
    pending: Arc<PendingSlot>,
    trail: Option<Arc<DecisionTrail>>,
}

impl NavigationInterceptor {
    /// Starts configuring an interceptor.
    pub fn builder() -> InterceptorBuilder {
        InterceptorBuilder::default()
    }

    /// Returns the navigation currently awaiting a decision or replay.
    pub fn pending(&self) -> Option<PendingNavigation> {
        self.pending.current()
    }

    /// Returns true if navigations are gated by a trust policy.
    pub fn has_trust_policy(&self) -> bool {
        self.evaluator.is_some()
    }

    /// Returns the observer that was installed before this interceptor.
    pub fn original_observer(&self) -> Option<&Arc<dyn NavigationObserver>> {
        self.proxy.original()
    }

    fn record_stale_replay(&self, stale: &PendingNavigation, next: &NavigationRequest) {
        NavigationLog::new(stale.id, stale.request.host().unwrap_or_default()).warn(format_args!(
            "replay of {} was never reported back; {} starts instead",
            stale.request, next
        ));
        if let Some(trail) = &self.trail {
            trail.record(DecisionRecord::new(
                stale.id,
                &stale.request,
                DecisionOutcome::Rejected(ViolationKind::ReplayNotObserved),
            ));
        }
    }

    fn intercept(&self, evaluator: &TrustEvaluator, request: &NavigationRequest) {
        match self.pending.claim(request) {
            Ok(id) => {
                NavigationLog::new(id, request.host().unwrap_or_default())
                    .debug(format_args!("holding {} for trust evaluation", request));
                evaluator.evaluate(id, request.clone());
            }
            Err(violation) => {
                let id = NavigationId::next();
                NavigationLog::new(id, request.host().unwrap_or_default())
                    .warn(format_args!("blocking {}: {}", request, violation));
                if let Some(trail) = &self.trail {
                    trail.record(DecisionRecord::new(
                        id,
                        request,
                        DecisionOutcome::Rejected(violation.kind),
                    ));
                }
            }
        }
    }
}

impl NavigationObserver for NavigationInterceptor {
    fn handles(&self, _kind: EventKind) -> bool {
        true
    }

    fn should_start_load(&self, request: &NavigationRequest) -> bool {
        if let Some(id) = self.pending.take_replay(request) {
            NavigationLog::new(id, request.host().unwrap_or_default())
                .debug(format_args!("letting replay of {} through", request));
            return true;
        }
        if let Some(stale) = self.pending.evict_unmatched_replay(request) {
            self.record_stale_replay(&stale, request);
        }

        let original = self
            .proxy
            .forward_predicate(Event::ShouldStartLoad(request), true);

        let Some(evaluator) = &self.evaluator else {
            return original;
        };
        if original {
            self.intercept(evaluator, request);
        } else {
            tracing::debug!(url = %request, "original observer vetoed navigation");
        }
        false
    }

    fn load_started(&self) {
        self.proxy.forward(Event::LoadStarted);
    }

    fn load_finished(&self) {
        self.proxy.forward(Event::LoadFinished);
    }

    fn load_failed(&self, error: &LoadError) {
        self.proxy.forward(Event::LoadFailed(error));
    }

    fn is_trust_interceptor(&self) -> bool {
        true
    }
}

impl fmt::Debug for NavigationInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationInterceptor")
            .field("proxy", &self.proxy)
            .field("evaluator", &self.evaluator)
            .finish_non_exhaustive()
    }
}

/// Builder for installing a [`NavigationInterceptor`] on a surface.
///
/// # Examples
///
/// ```
/// use std::sync::{Arc, Mutex};
/// use nav_trust::{
///     Certificate, NavigationInterceptor, NavigationObserver, NavigationRequest,
///     RenderSurface,
/// };
///
/// #[derive(Default)]
/// struct Surface {
///     observer: Mutex<Option<Arc<dyn NavigationObserver>>>,
/// }
///
/// impl RenderSurface for Surface {
///     fn observer(&self) -> Option<Arc<dyn NavigationObserver>> {
///         self.observer.lock().unwrap().clone()
///     }
///     fn set_observer(&self, observer: Arc<dyn NavigationObserver>) {
///         *self.observer.lock().unwrap() = Some(observer);
///     }
///     fn load_request(&self, _request: NavigationRequest) {}
/// }
///
/// let surface = Arc::new(Surface::default());
///
/// // No policy: a pure pass-through that needs no network stack.
/// let first = NavigationInterceptor::builder().install(&surface).unwrap();
/// assert!(first.interceptor().is_some());
///
/// // A second install is a no-op.
/// let second = NavigationInterceptor::builder()
///     .trust_policy(|_: &Certificate| true)
///     .install(&surface)
///     .unwrap();
/// assert!(second.interceptor().is_none());
/// ```
#[derive(Default)]
pub struct InterceptorBuilder {
    policy: Option<Arc<dyn TrustPolicy>>,
    connector: Option<Arc<dyn ShadowConnector>>,
    trail: Option<Arc<DecisionTrail>>,
}

impl InterceptorBuilder {
    /// Gates navigations behind `policy`.
    pub fn trust_policy(self, policy: impl TrustPolicy + 'static) -> Self {
        self.shared_trust_policy(Arc::new(policy))
    }

    /// Gates navigations behind a policy shared with other surfaces.
    pub fn shared_trust_policy(mut self, policy: Arc<dyn TrustPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Uses `connector` for shadow connections.
    ///
    /// Defaults to a [`TlsShadowConnector`] on the current tokio runtime.
    pub fn connector(self, connector: impl ShadowConnector + 'static) -> Self {
        self.shared_connector(Arc::new(connector))
    }

    /// Uses a connector shared with other surfaces.
    pub fn shared_connector(mut self, connector: Arc<dyn ShadowConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Records every decision in `trail`.
    pub fn audit_trail(mut self, trail: Arc<DecisionTrail>) -> Self {
        self.trail = Some(trail);
        self
    }

    /// Wraps the surface's current observer and installs the interceptor.
    ///
    /// The new observer is fully built before the single assignment, so the
    /// surface never sees an intermediate state. If the current observer
    /// already is an interceptor nothing changes.
    ///
    /// # Errors
    ///
    /// Returns an error if a trust policy is set, no connector was given,
    /// and the default TLS connector cannot be built (for example outside a
    /// tokio runtime).
    pub fn install<S>(self, surface: &Arc<S>) -> Result<Installation, Error>
    where
        S: RenderSurface + 'static,
    {
        let current = surface.observer();
        if current
            .as_ref()
            .is_some_and(|observer| observer.is_trust_interceptor())
        {
            tracing::debug!("surface already intercepted; install skipped");
            return Ok(Installation::AlreadyInstalled);
        }

        let pending = Arc::new(PendingSlot::new());
        let evaluator = match self.policy {
            Some(policy) => {
                let connector = match self.connector {
                    Some(connector) => connector,
                    None => default_connector()?,
                };
                let dyn_surface: Arc<dyn RenderSurface> = surface.clone();
                Some(TrustEvaluator::new(
                    policy,
                    connector,
                    Arc::downgrade(&dyn_surface),
                    pending.clone(),
                    self.trail.clone(),
                ))
            }
            None => None,
        };

        let interceptor = Arc::new(NavigationInterceptor {
            proxy: ForwardingProxy::new(current),
            evaluator,
            pending,
            trail: self.trail,
        });
        surface.set_observer(interceptor.clone());
        tracing::info!(
            trust_policy = interceptor.has_trust_policy(),
            "navigation interceptor installed"
        );

        Ok(Installation::Installed(interceptor))
    }
}

fn default_connector() -> Result<Arc<dyn ShadowConnector>, Error> {
    let handle = Handle::try_current()
        .map_err(|e| Error::TlsConfig(format!("default shadow connector needs a tokio runtime: {e}")))?;
    Ok(Arc::new(TlsShadowConnector::new(
        handle,
        TlsConfig::builder().build(),
    )))
}
