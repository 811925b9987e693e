use std::fmt;
use std::io;

/// Errors that can occur while intercepting and evaluating navigations.
///
/// None of these ever reach the original observer. A navigation that hits
/// one of them is dropped and, if an audit trail is configured, recorded
/// there as a [`Violation`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A navigation was dropped by the trust layer
    #[error("navigation dropped: {0}")]
    Violation(#[from] Violation),

    /// The navigation target cannot be reached by a shadow connection
    #[error("invalid navigation target: {0}")]
    InvalidTarget(String),

    /// The TCP connection to the target failed
    #[error("failed to connect to {host}:{port}")]
    Connect {
        /// Target host
        host: String,
        /// Target port
        port: u16,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The TCP connection did not complete within the configured timeout
    #[error("connection to {host}:{port} timed out")]
    Timeout {
        /// Target host
        host: String,
        /// Target port
        port: u16,
    },

    /// The TLS handshake failed
    #[error("TLS handshake failed: {0}")]
    Handshake(String),

    /// The TLS client configuration could not be built
    #[error("TLS configuration error: {0}")]
    TlsConfig(String),
}

/// A dropped navigation with details about why it was dropped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct Violation {
    /// The kind of violation that occurred
    pub kind: ViolationKind,
    /// Human-readable message explaining the violation
    pub message: String,
}

impl Violation {
    /// Creates a new violation.
    pub fn new(kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// The kind of violation that caused a navigation to be dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViolationKind {
    /// No certificate in the server chain was accepted by the trust policy
    CertificateRejected,
    /// Another navigation was already awaiting a trust decision
    ConcurrentNavigation,
    /// The shadow connection failed before a decision could be made
    ShadowConnectionFailed,
    /// The rendering surface was released before the replay
    SurfaceReleased,
    /// The surface never reported the replayed navigation back; the slot
    /// was freed when a different navigation started
    ReplayNotObserved,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::CertificateRejected => write!(f, "certificate rejected"),
            ViolationKind::ConcurrentNavigation => write!(f, "concurrent navigation"),
            ViolationKind::ShadowConnectionFailed => write!(f, "shadow connection failed"),
            ViolationKind::SurfaceReleased => write!(f, "surface released"),
            ViolationKind::ReplayNotObserved => write!(f, "replay not observed"),
        }
    }
}
