//! In-memory record of trust decisions.
//!
//! The surface's observer has no "rejected by policy" event, so a dropped
//! navigation is invisible to it. Hosts that need to know can attach a
//! [`DecisionTrail`] to the interceptor and inspect it.
//!
//! Records never contain query strings or certificate bytes; only the
//! redacted URL, the host and the accepted certificate's fingerprint.

mod event;
mod trail;

pub use event::{DecisionOutcome, DecisionRecord};
pub use trail::DecisionTrail;
