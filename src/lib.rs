//! TLS trust-decision interception for embedded web-rendering surfaces.
//!
//! Before a surface is allowed to start a top-level navigation, this crate
//! independently connects to the target, hands the server's certificate
//! chain to a caller-supplied trust policy, and only then lets the
//! navigation proceed. Every other event reaches the surface's original
//! observer unchanged.
//!
//! - **Navigation interceptor**: wraps the surface's observer and owns the
//!   allow / block / replay protocol
//! - **Trust evaluator**: runs the shadow handshake and asks the policy,
//!   first accepted certificate wins
//! - **Forwarding proxy**: relays events the original observer handles
//!
//! # Core Types
//!
//! - [`NavigationInterceptor`]: installed once per surface via its builder
//! - [`TrustPolicy`]: `Fn(&Certificate) -> bool`, or [`PinnedCertificates`]
//! - [`RenderSurface`]: implemented by the host
//! - [`ShadowConnector`]: network seam; [`TlsShadowConnector`] is the
//!   tokio/rustls implementation
//! - [`audit::DecisionTrail`]: optional record of decisions
//!
//! # Known limitation
//!
//! A navigation rejected by the policy is dropped without telling the
//! original observer, because observers have no event for it. The surface
//! just stays on its current page.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use nav_trust::{NavigationInterceptor, PinnedCertificates, RenderSurface};
//!
//! # async fn example(surface: Arc<impl RenderSurface + 'static>) -> Result<(), nav_trust::Error> {
//! let policy = PinnedCertificates::new()
//!     .pin_for_host("bank.example", "3f1c...e9");
//!
//! // Inside a tokio runtime the default TLS connector is used.
//! NavigationInterceptor::builder()
//!     .trust_policy(policy)
//!     .install(&surface)?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod audit;
mod certificate;
mod error;
mod evaluator;
mod forwarding;
mod interceptor;
mod logging;
mod observer;
mod pending;
mod policy;
mod request;
mod shadow;
mod surface;
mod tls;

pub use certificate::Certificate;
pub use error::{Error, Violation, ViolationKind};
pub use forwarding::{Event, ForwardingProxy};
pub use interceptor::{Installation, InterceptorBuilder, NavigationInterceptor};
pub use logging::NavigationLog;
pub use observer::{EventKind, NavigationObserver, ObserverSlots};
pub use pending::PendingNavigation;
pub use policy::{PinnedCertificates, TrustPolicy};
pub use request::{LoadError, NavigationId, NavigationRequest, NavigationType};
pub use shadow::{
    AuthChallenge, AuthMethod, ChallengeDisposition, ProtectionSpace, ShadowConnection,
    ShadowConnector, ShadowDelegate,
};
pub use surface::RenderSurface;
pub use tls::{TlsConfig, TlsConfigBuilder, TlsShadowConnector};
