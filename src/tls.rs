//! Shadow connections over tokio and rustls.
//!
//! A shadow connection connects to the navigation target, runs the TLS
//! handshake far enough to see the server's certificate chain, and is
//! dropped without ever writing application data. The chain is turned into
//! an [`AuthChallenge`] inside a custom certificate verifier, so the trust
//! decision is made while the handshake is suspended. A server that asks
//! for a client certificate raises a second,
//! [`AuthMethod::ClientCertificate`] challenge.
//!
//! Targets without a server to authenticate (`file:`, `data:`, `about:`,
//! `blob:`) get no connection at all: they report a response right away.
//!
//! There is no platform trust store. Answering a server-trust challenge
//! with [`ChallengeDisposition::PerformDefaultHandling`] fails the
//! handshake as if the issuer were unknown.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::ResolvesClientCert;
use rustls::crypto::{self, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::sign::CertifiedKey;
use rustls::{CertificateError, ClientConfig, DigitallySignedStruct, SignatureScheme};
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio_rustls::TlsConnector;
use tokio_util::sync::CancellationToken;
use url::Host;

use crate::error::Error;
use crate::request::NavigationRequest;
use crate::shadow::{
    AuthChallenge, AuthMethod, ChallengeDisposition, ShadowConnection, ShadowConnector,
    ShadowDelegate,
};

/// Schemes whose content never comes from a remote server.
const LOCAL_SCHEMES: [&str; 4] = ["file", "data", "about", "blob"];

/// Builder for [`TlsConfig`].
#[derive(Debug, Clone, Default)]
pub struct TlsConfigBuilder {
    connect_timeout: Option<Duration>,
}

impl TlsConfigBuilder {
    /// Creates a builder with no connect timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gives up on the TCP connect after `timeout`.
    ///
    /// Without a timeout a target that never answers keeps its navigation
    /// blocked.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Builds the configuration on the ring crypto provider.
    pub fn build(self) -> TlsConfig {
        TlsConfig {
            provider: Arc::new(crypto::ring::default_provider()),
            connect_timeout: self.connect_timeout,
        }
    }
}

/// Configuration shared by all shadow connections of a connector.
#[derive(Clone)]
pub struct TlsConfig {
    provider: Arc<CryptoProvider>,
    connect_timeout: Option<Duration>,
}

impl TlsConfig {
    /// Starts building a configuration.
    pub fn builder() -> TlsConfigBuilder {
        TlsConfigBuilder::new()
    }

    /// Returns the TCP connect timeout, if any.
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }
}

impl fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsConfig")
            .field("connect_timeout", &self.connect_timeout)
            .finish_non_exhaustive()
    }
}

/// Opens shadow connections on a tokio runtime.
#[derive(Debug, Clone)]
pub struct TlsShadowConnector {
    runtime: Handle,
    config: TlsConfig,
}

impl TlsShadowConnector {
    /// Creates a connector that spawns its handshakes on `runtime`.
    pub fn new(runtime: Handle, config: TlsConfig) -> Self {
        Self { runtime, config }
    }

    /// Creates a connector on the runtime of the calling context.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TlsConfig`] when called outside a tokio runtime.
    pub fn current(config: TlsConfig) -> Result<Self, Error> {
        let runtime = Handle::try_current()
            .map_err(|e| Error::TlsConfig(format!("no tokio runtime: {e}")))?;
        Ok(Self::new(runtime, config))
    }
}

impl ShadowConnector for TlsShadowConnector {
    fn open(
        &self,
        request: &NavigationRequest,
        delegate: Arc<dyn ShadowDelegate>,
    ) -> Result<(), Error> {
        let route = Route::from_request(request)?;
        let connection = Arc::new(TlsShadowConnection::default());

        match route {
            Route::Local => {
                tracing::debug!(url = %request, "local target, no server identity to check");
                self.runtime.spawn(async move {
                    if !connection.is_cancelled() {
                        delegate.on_response(connection.as_ref());
                    }
                });
            }
            Route::Remote(target) => {
                tracing::debug!(host = %target.host, port = target.port, secure = target.secure, "shadow connection");
                self.runtime
                    .spawn(drive(target, self.config.clone(), connection, delegate));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Route {
    Local,
    Remote(Target),
}

impl Route {
    fn from_request(request: &NavigationRequest) -> Result<Self, Error> {
        let url = request.url();
        let secure = match url.scheme() {
            "https" => true,
            "http" => false,
            scheme if LOCAL_SCHEMES.contains(&scheme) => return Ok(Route::Local),
            other => {
                return Err(Error::InvalidTarget(format!(
                    "{request}: unsupported scheme {other}"
                )))
            }
        };
        let host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(ip)) => ip.to_string(),
            Some(Host::Ipv6(ip)) => ip.to_string(),
            None => return Err(Error::InvalidTarget(format!("{request}: no host"))),
        };
        let port = request
            .port()
            .ok_or_else(|| Error::InvalidTarget(format!("{request}: no port")))?;

        Ok(Route::Remote(Target { host, port, secure }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Target {
    host: String,
    port: u16,
    secure: bool,
}

#[derive(Debug, Default)]
struct TlsShadowConnection {
    token: CancellationToken,
}

impl ShadowConnection for TlsShadowConnection {
    fn cancel(&self) {
        self.token.cancel();
    }

    fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

async fn drive(
    target: Target,
    config: TlsConfig,
    connection: Arc<TlsShadowConnection>,
    delegate: Arc<dyn ShadowDelegate>,
) {
    let outcome = tokio::select! {
        () = connection.token.cancelled() => return,
        outcome = handshake(&target, &config, &connection, &delegate) => outcome,
    };
    if connection.is_cancelled() {
        return;
    }
    match outcome {
        Ok(()) => delegate.on_response(connection.as_ref()),
        Err(err) => {
            tracing::debug!(host = %target.host, error = %err, "shadow connection failed");
            delegate.on_failure(connection.as_ref(), &err);
        }
    }
}

async fn handshake(
    target: &Target,
    config: &TlsConfig,
    connection: &Arc<TlsShadowConnection>,
    delegate: &Arc<dyn ShadowDelegate>,
) -> Result<(), Error> {
    let tcp = connect(target, config.connect_timeout).await?;
    if !target.secure {
        return Ok(());
    }

    let verifier = Arc::new(ChallengeVerifier {
        host: target.host.clone(),
        port: target.port,
        delegate: delegate.clone(),
        connection: connection.clone(),
        provider: config.provider.clone(),
    });
    let client_auth = Arc::new(ClientCertChallenge {
        host: target.host.clone(),
        port: target.port,
        delegate: delegate.clone(),
        connection: connection.clone(),
    });
    let client_config = ClientConfig::builder_with_provider(config.provider.clone())
        .with_safe_default_protocol_versions()
        .map_err(|e| Error::TlsConfig(e.to_string()))?
        .dangerous()
        .with_custom_certificate_verifier(verifier)
        .with_client_cert_resolver(client_auth);
    let server_name = ServerName::try_from(target.host.clone())
        .map_err(|e| Error::InvalidTarget(format!("{}: {e}", target.host)))?;

    // Dropped right away: nothing is ever written on a shadow connection.
    let _stream = TlsConnector::from(Arc::new(client_config))
        .connect(server_name, tcp)
        .await
        .map_err(|e| Error::Handshake(e.to_string()))?;
    Ok(())
}

async fn connect(target: &Target, timeout: Option<Duration>) -> Result<TcpStream, Error> {
    let attempt = TcpStream::connect((target.host.as_str(), target.port));
    let result = match timeout {
        Some(limit) => tokio::time::timeout(limit, attempt)
            .await
            .map_err(|_| Error::Timeout {
                host: target.host.clone(),
                port: target.port,
            })?,
        None => attempt.await,
    };
    result.map_err(|source| Error::Connect {
        host: target.host.clone(),
        port: target.port,
        source,
    })
}

/// Turns the server chain into a challenge for the delegate.
struct ChallengeVerifier {
    host: String,
    port: u16,
    delegate: Arc<dyn ShadowDelegate>,
    connection: Arc<TlsShadowConnection>,
    provider: Arc<CryptoProvider>,
}

impl fmt::Debug for ChallengeVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChallengeVerifier")
            .field("host", &self.host)
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}

impl ServerCertVerifier for ChallengeVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        let chain = std::iter::once(end_entity)
            .chain(intermediates.iter())
            .map(|cert| cert.as_ref().to_vec())
            .collect();
        let challenge = AuthChallenge::server_trust(self.host.clone(), self.port, chain);

        match self
            .delegate
            .on_challenge(self.connection.as_ref(), &challenge)
        {
            ChallengeDisposition::UseCredential => Ok(ServerCertVerified::assertion()),
            ChallengeDisposition::Cancel => Err(rustls::Error::InvalidCertificate(
                CertificateError::ApplicationVerificationFailure,
            )),
            ChallengeDisposition::PerformDefaultHandling => Err(
                rustls::Error::InvalidCertificate(CertificateError::UnknownIssuer),
            ),
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// Turns a server's certificate request into a challenge for the delegate.
///
/// Shadow connections carry no client identity, so the answer is always an
/// empty certificate; the server decides whether to continue without one.
/// [`ChallengeDisposition::Cancel`] abandons the connection.
struct ClientCertChallenge {
    host: String,
    port: u16,
    delegate: Arc<dyn ShadowDelegate>,
    connection: Arc<TlsShadowConnection>,
}

impl fmt::Debug for ClientCertChallenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCertChallenge")
            .field("host", &self.host)
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}

impl ResolvesClientCert for ClientCertChallenge {
    fn resolve(
        &self,
        _root_hint_subjects: &[&[u8]],
        _sigschemes: &[SignatureScheme],
    ) -> Option<Arc<CertifiedKey>> {
        if self.connection.is_cancelled() {
            return None;
        }
        let challenge =
            AuthChallenge::other(self.host.clone(), self.port, AuthMethod::ClientCertificate);
        let disposition = self
            .delegate
            .on_challenge(self.connection.as_ref(), &challenge);
        if disposition == ChallengeDisposition::Cancel {
            self.connection.cancel();
        }
        None
    }

    fn has_certs(&self) -> bool {
        true
    }
}
