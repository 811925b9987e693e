//! Network-layer seam for shadow connections.
//!
//! A shadow connection is opened only to learn the server's identity. It
//! never carries page content. The connector reports progress to a
//! [`ShadowDelegate`] in this order:
//!
//! ```text
//! open --> on_challenge* --> on_response
//!                       \--> on_failure
//! ```
//!
//! Once the connection is cancelled the connector must not call the
//! delegate again.

use std::fmt;
use std::sync::Arc;

use crate::error::Error;
use crate::request::NavigationRequest;

/// Kind of authentication a challenge asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMethod {
    /// The client must decide whether to trust the server's certificate chain
    ServerTrust,
    /// The server asks the client for a certificate
    ClientCertificate,
    /// HTTP basic, digest, NTLM and the like
    Credentials,
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMethod::ServerTrust => write!(f, "server_trust"),
            AuthMethod::ClientCertificate => write!(f, "client_certificate"),
            AuthMethod::Credentials => write!(f, "credentials"),
        }
    }
}

/// Where a challenge comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectionSpace {
    /// Host that issued the challenge
    pub host: String,
    /// Port the connection was made to
    pub port: u16,
    /// Authentication method requested
    pub method: AuthMethod,
}

/// An authentication challenge received on a shadow connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChallenge {
    /// Origin and method of the challenge
    pub protection_space: ProtectionSpace,
    /// DER-encoded server certificates, leaf first. Empty for methods
    /// other than [`AuthMethod::ServerTrust`].
    pub chain: Vec<Vec<u8>>,
}

impl AuthChallenge {
    /// Creates a server-trust challenge carrying `chain`.
    pub fn server_trust(host: impl Into<String>, port: u16, chain: Vec<Vec<u8>>) -> Self {
        Self {
            protection_space: ProtectionSpace {
                host: host.into(),
                port,
                method: AuthMethod::ServerTrust,
            },
            chain,
        }
    }

    /// Creates a challenge of any other method.
    pub fn other(host: impl Into<String>, port: u16, method: AuthMethod) -> Self {
        Self {
            protection_space: ProtectionSpace {
                host: host.into(),
                port,
                method,
            },
            chain: Vec::new(),
        }
    }
}

/// How a delegate answers a challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeDisposition {
    /// Trust the presented chain and continue the handshake
    UseCredential,
    /// Abort the challenge; the connection fails
    Cancel,
    /// Let the network layer apply its own default handling
    PerformDefaultHandling,
}

/// Handle to an open shadow connection.
pub trait ShadowConnection: Send + Sync {
    /// Cancels the connection. Idempotent.
    fn cancel(&self);

    /// Returns true once [`cancel`](ShadowConnection::cancel) was called.
    fn is_cancelled(&self) -> bool;
}

/// Receives the progress of one shadow connection.
pub trait ShadowDelegate: Send + Sync {
    /// The server issued an authentication challenge.
    fn on_challenge(
        &self,
        connection: &dyn ShadowConnection,
        challenge: &AuthChallenge,
    ) -> ChallengeDisposition;

    /// A response is available; the server's identity is settled.
    fn on_response(&self, connection: &dyn ShadowConnection);

    /// The connection failed for a reason other than its own cancellation.
    fn on_failure(&self, connection: &dyn ShadowConnection, error: &Error);
}

/// Opens shadow connections.
pub trait ShadowConnector: Send + Sync {
    /// Starts a shadow connection to the target of `request`.
    ///
    /// Progress is delivered to `delegate` later, never from inside this
    /// call.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot even be started, for
    /// example when the request has no host.
    fn open(
        &self,
        request: &NavigationRequest,
        delegate: Arc<dyn ShadowDelegate>,
    ) -> Result<(), Error>;
}
