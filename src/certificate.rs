use std::fmt;

use sha2::{Digest, Sha256};

/// A server certificate presented during a shadow handshake.
///
/// Built fresh for every chain entry that is evaluated and dropped once the
/// trust policy has answered. Only the DER bytes are kept; derived fields
/// such as the fingerprint are computed on demand.
///
/// # Examples
///
/// ```
/// use nav_trust::Certificate;
///
/// let cert = Certificate::new("example.com", vec![0x30, 0x03, 0x02, 0x01, 0x01]);
/// assert_eq!(cert.host(), "example.com");
/// assert_eq!(cert.fingerprint_hex().len(), 64);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Certificate {
    host: String,
    raw_bytes: Vec<u8>,
}

impl Certificate {
    /// Creates a certificate for `host` from its DER encoding.
    pub fn new(host: impl Into<String>, raw_bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            host: host.into(),
            raw_bytes: raw_bytes.into(),
        }
    }

    /// Host the certificate was presented for.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// DER-encoded certificate bytes.
    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw_bytes
    }

    /// SHA-256 digest of the DER bytes.
    pub fn fingerprint(&self) -> [u8; 32] {
        Sha256::digest(&self.raw_bytes).into()
    }

    /// SHA-256 digest of the DER bytes as lowercase hex.
    pub fn fingerprint_hex(&self) -> String {
        hex::encode(self.fingerprint())
    }
}

// Raw bytes are noise in logs.
impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("host", &self.host)
            .field("len", &self.raw_bytes.len())
            .field("sha256", &self.fingerprint_hex())
            .finish()
    }
}
