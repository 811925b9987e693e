//! Decision record schema.

use std::fmt;

use crate::error::ViolationKind;
use crate::request::{NavigationId, NavigationRequest};

/// What happened to a navigation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionOutcome {
    /// A certificate was accepted (or no identity check was needed)
    Approved,
    /// The approved navigation was reissued on the surface
    Replayed,
    /// The navigation was dropped
    Rejected(ViolationKind),
}

impl fmt::Display for DecisionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionOutcome::Approved => write!(f, "approved"),
            DecisionOutcome::Replayed => write!(f, "replayed"),
            DecisionOutcome::Rejected(kind) => write!(f, "rejected ({})", kind),
        }
    }
}

/// One entry of a [`DecisionTrail`](super::DecisionTrail).
///
/// # Example
///
/// ```
/// use nav_trust::NavigationRequest;
/// use nav_trust::audit::{DecisionOutcome, DecisionRecord};
///
/// let request = NavigationRequest::parse("https://bank.test/login?token=abc").unwrap();
/// # let id = nav_trust::NavigationId::from_raw(7);
/// let record = DecisionRecord::new(id, &request, DecisionOutcome::Approved)
///     .with_certificate(1, "ab12");
///
/// assert_eq!(record.host(), "bank.test");
/// assert_eq!(record.redacted_url(), "https://bank.test/login");
/// assert_eq!(record.certificate_index(), Some(1));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionRecord {
    navigation_id: NavigationId,
    host: String,
    /// URL without query or fragment
    redacted_url: String,
    outcome: DecisionOutcome,
    /// Position in the chain of the accepted certificate
    certificate_index: Option<usize>,
    fingerprint: Option<String>,
}

impl DecisionRecord {
    /// Creates a record for `request`.
    pub fn new(
        navigation_id: NavigationId,
        request: &NavigationRequest,
        outcome: DecisionOutcome,
    ) -> Self {
        let mut url = request.url().clone();
        url.set_query(None);
        url.set_fragment(None);

        Self {
            navigation_id,
            host: request.host().unwrap_or_default().to_string(),
            redacted_url: url.to_string(),
            outcome,
            certificate_index: None,
            fingerprint: None,
        }
    }

    /// Sets the accepted certificate's chain position and fingerprint.
    pub fn with_certificate(mut self, index: usize, fingerprint: impl Into<String>) -> Self {
        self.certificate_index = Some(index);
        self.fingerprint = Some(fingerprint.into());
        self
    }

    /// Returns the navigation id.
    pub fn navigation_id(&self) -> NavigationId {
        self.navigation_id
    }

    /// Returns the target host.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the target URL without query or fragment.
    pub fn redacted_url(&self) -> &str {
        &self.redacted_url
    }

    /// Returns the outcome.
    pub fn outcome(&self) -> DecisionOutcome {
        self.outcome
    }

    /// Returns the chain position of the accepted certificate, if any.
    pub fn certificate_index(&self) -> Option<usize> {
        self.certificate_index
    }

    /// Returns the SHA-256 fingerprint of the accepted certificate, if any.
    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }
}

impl fmt::Display for DecisionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Decision[{}, outcome={}, url={}",
            self.navigation_id, self.outcome, self.redacted_url
        )?;
        if let (Some(index), Some(fingerprint)) = (self.certificate_index, &self.fingerprint) {
            write!(f, ", cert={}#{}", index, fingerprint)?;
        }
        write!(f, "]")
    }
}
