use std::collections::{HashMap, HashSet};

use crate::certificate::Certificate;

/// Decides whether a server certificate is acceptable.
///
/// The policy is asked once per chain entry, in chain order, until it
/// accepts one. Any `Fn(&Certificate) -> bool` is a policy.
///
/// # Examples
///
/// ```
/// use nav_trust::{Certificate, TrustPolicy};
///
/// let only_example = |cert: &Certificate| cert.host() == "example.com";
///
/// assert!(only_example.should_trust(&Certificate::new("example.com", vec![1])));
/// assert!(!only_example.should_trust(&Certificate::new("evil.test", vec![1])));
/// ```
pub trait TrustPolicy: Send + Sync {
    /// Returns true if `certificate` should be trusted.
    fn should_trust(&self, certificate: &Certificate) -> bool;
}

impl<F> TrustPolicy for F
where
    F: Fn(&Certificate) -> bool + Send + Sync,
{
    fn should_trust(&self, certificate: &Certificate) -> bool {
        self(certificate)
    }
}

/// Accepts certificates whose SHA-256 fingerprint has been pinned.
///
/// Pins are either global (valid for any host) or scoped to one host.
/// Fingerprints are compared as lowercase hex; colons and case in the
/// configured value are ignored.
///
/// # Examples
///
/// ```
/// use nav_trust::{Certificate, PinnedCertificates, TrustPolicy};
///
/// let cert = Certificate::new("api.example.com", b"der".to_vec());
/// let policy = PinnedCertificates::new().pin_for_host("api.example.com", cert.fingerprint_hex());
///
/// assert!(policy.should_trust(&cert));
/// assert!(!policy.should_trust(&Certificate::new("other.example.com", b"der".to_vec())));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PinnedCertificates {
    global: HashSet<String>,
    per_host: HashMap<String, HashSet<String>>,
}

impl PinnedCertificates {
    /// Creates a policy with no pins; it rejects everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins a fingerprint for every host.
    pub fn pin(mut self, fingerprint: impl AsRef<str>) -> Self {
        self.global.insert(normalize(fingerprint.as_ref()));
        self
    }

    /// Pins a fingerprint for one host.
    pub fn pin_for_host(mut self, host: impl Into<String>, fingerprint: impl AsRef<str>) -> Self {
        self.per_host
            .entry(host.into().to_ascii_lowercase())
            .or_default()
            .insert(normalize(fingerprint.as_ref()));
        self
    }

    /// Returns the number of configured pins.
    pub fn len(&self) -> usize {
        self.global.len() + self.per_host.values().map(HashSet::len).sum::<usize>()
    }

    /// Returns true if no pins are configured.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TrustPolicy for PinnedCertificates {
    fn should_trust(&self, certificate: &Certificate) -> bool {
        let fingerprint = certificate.fingerprint_hex();
        if self.global.contains(&fingerprint) {
            return true;
        }
        self.per_host
            .get(&certificate.host().to_ascii_lowercase())
            .is_some_and(|pins| pins.contains(&fingerprint))
    }
}

fn normalize(fingerprint: &str) -> String {
    fingerprint
        .chars()
        .filter(|c| *c != ':' && !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase()
}
