//! Shadow-handshake trust evaluation.
//!
//! For every blocked navigation the evaluator opens a shadow connection to
//! the same target, hands the server's chain to the trust policy, and then
//! either replays the navigation on the surface or drops it.

use std::fmt;
use std::sync::{Arc, Weak};

use crate::audit::{DecisionOutcome, DecisionRecord, DecisionTrail};
use crate::certificate::Certificate;
use crate::error::{Error, Violation, ViolationKind};
use crate::logging::NavigationLog;
use crate::pending::PendingSlot;
use crate::policy::TrustPolicy;
use crate::request::{NavigationId, NavigationRequest};
use crate::shadow::{
    AuthChallenge, AuthMethod, ChallengeDisposition, ShadowConnection, ShadowConnector,
    ShadowDelegate,
};
use crate::surface::RenderSurface;

/// Performs shadow handshakes and renders trust decisions.
///
/// Cheap to clone; clones share the same policy, connector and pending slot.
#[derive(Clone)]
pub(crate) struct TrustEvaluator {
    shared: Arc<Shared>,
}

struct Shared {
    policy: Arc<dyn TrustPolicy>,
    connector: Arc<dyn ShadowConnector>,
    surface: Weak<dyn RenderSurface>,
    pending: Arc<PendingSlot>,
    trail: Option<Arc<DecisionTrail>>,
}

impl TrustEvaluator {
    pub(crate) fn new(
        policy: Arc<dyn TrustPolicy>,
        connector: Arc<dyn ShadowConnector>,
        surface: Weak<dyn RenderSurface>,
        pending: Arc<PendingSlot>,
        trail: Option<Arc<DecisionTrail>>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                policy,
                connector,
                surface,
                pending,
                trail,
            }),
        }
    }

    /// Starts evaluating navigation `id`.
    ///
    /// Returns immediately. The outcome is delivered later by replaying the
    /// request on the surface, or by releasing the pending slot.
    pub(crate) fn evaluate(&self, id: NavigationId, request: NavigationRequest) {
        let log = NavigationLog::new(id, request.host().unwrap_or_default());
        log.debug(format_args!("opening shadow connection to {}", request));

        let session = Arc::new(ShadowSession {
            evaluator: self.clone(),
            id,
            request: request.clone(),
        });

        if let Err(err) = self.shared.connector.open(&request, session) {
            self.drop_navigation(
                id,
                &request,
                Violation::new(ViolationKind::ShadowConnectionFailed, err.to_string()),
            );
        }
    }

    fn drop_navigation(&self, id: NavigationId, request: &NavigationRequest, violation: Violation) {
        if !self.shared.pending.release(id) {
            return;
        }
        // The original observer is not told: it has no event for this.
        NavigationLog::new(id, request.host().unwrap_or_default())
            .warn(format_args!("dropping navigation to {}: {}", request, violation));
        self.record(DecisionRecord::new(
            id,
            request,
            DecisionOutcome::Rejected(violation.kind),
        ));
    }

    fn record(&self, record: DecisionRecord) {
        if let Some(trail) = &self.shared.trail {
            trail.record(record);
        }
    }
}

impl fmt::Debug for TrustEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustEvaluator")
            .field("pending", &self.shared.pending.current())
            .field("audited", &self.shared.trail.is_some())
            .finish_non_exhaustive()
    }
}

/// Delegate for one shadow connection.
struct ShadowSession {
    evaluator: TrustEvaluator,
    id: NavigationId,
    request: NavigationRequest,
}

impl ShadowSession {
    fn log(&self) -> NavigationLog<'_> {
        NavigationLog::new(self.id, self.request.host().unwrap_or_default())
    }

    fn shared(&self) -> &Shared {
        &self.evaluator.shared
    }

    fn evaluate_chain(&self, challenge: &AuthChallenge) -> Option<(usize, String)> {
        let host = &challenge.protection_space.host;
        challenge
            .chain
            .iter()
            .enumerate()
            .find_map(|(index, der)| {
                let certificate = Certificate::new(host.as_str(), der.as_slice());
                let trusted = self.shared().policy.should_trust(&certificate);
                self.log().debug(format_args!(
                    "certificate #{} {}: {}",
                    index,
                    certificate.fingerprint_hex(),
                    if trusted { "trusted" } else { "not trusted" }
                ));
                trusted.then(|| (index, certificate.fingerprint_hex()))
            })
    }
}

impl ShadowDelegate for ShadowSession {
    fn on_challenge(
        &self,
        connection: &dyn ShadowConnection,
        challenge: &AuthChallenge,
    ) -> ChallengeDisposition {
        let method = challenge.protection_space.method;
        if method != AuthMethod::ServerTrust {
            self.log()
                .debug(format_args!("{} challenge gets default handling", method));
            return ChallengeDisposition::PerformDefaultHandling;
        }

        match self.evaluate_chain(challenge) {
            Some((index, fingerprint)) => {
                if self.shared().pending.approve(self.id) {
                    self.log().info(format_args!(
                        "certificate #{} accepted for {}",
                        index, challenge.protection_space.host
                    ));
                    self.evaluator.record(
                        DecisionRecord::new(self.id, &self.request, DecisionOutcome::Approved)
                            .with_certificate(index, fingerprint),
                    );
                }
                ChallengeDisposition::UseCredential
            }
            None => {
                connection.cancel();
                self.evaluator.drop_navigation(
                    self.id,
                    &self.request,
                    Violation::new(
                        ViolationKind::CertificateRejected,
                        format!(
                            "none of {} certificates accepted for {}",
                            challenge.chain.len(),
                            challenge.protection_space.host
                        ),
                    ),
                );
                ChallengeDisposition::Cancel
            }
        }
    }

    fn on_response(&self, connection: &dyn ShadowConnection) {
        connection.cancel();

        // Reaching a response without a server-trust challenge means the
        // target needed no identity decision (plain http, default handling).
        if self.shared().pending.approve(self.id) {
            self.log()
                .info(format_args!("approved without server-trust challenge"));
            self.evaluator.record(DecisionRecord::new(
                self.id,
                &self.request,
                DecisionOutcome::Approved,
            ));
        }

        // Marked before loading so a surface that calls straight back into
        // should_start_load finds the replay already issued.
        let Some(request) = self.shared().pending.begin_replay(self.id) else {
            return;
        };

        let Some(surface) = self.shared().surface.upgrade() else {
            self.evaluator.drop_navigation(
                self.id,
                &request,
                Violation::new(ViolationKind::SurfaceReleased, "surface is gone"),
            );
            return;
        };

        self.log().info(format_args!("replaying {}", request));
        self.evaluator.record(DecisionRecord::new(
            self.id,
            &request,
            DecisionOutcome::Replayed,
        ));
        surface.load_request(request);
    }

    fn on_failure(&self, connection: &dyn ShadowConnection, error: &Error) {
        if connection.is_cancelled() {
            return;
        }
        connection.cancel();
        self.evaluator.drop_navigation(
            self.id,
            &self.request,
            Violation::new(ViolationKind::ShadowConnectionFailed, error.to_string()),
        );
    }
}
