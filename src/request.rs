use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use url::Url;

use crate::error::Error;

/// How a navigation was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NavigationType {
    /// The user followed a link
    LinkClicked,
    /// A form was submitted
    FormSubmitted,
    /// Back or forward in history
    BackForward,
    /// The page was reloaded
    Reload,
    /// A form was submitted again
    FormResubmitted,
    /// Anything else, including programmatic loads and replays
    #[default]
    Other,
}

/// A top-level navigation request issued by the rendering surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationRequest {
    url: Url,
    navigation_type: NavigationType,
}

impl NavigationRequest {
    /// Creates a request for an already parsed URL.
    pub fn new(url: Url, navigation_type: NavigationType) -> Self {
        Self {
            url,
            navigation_type,
        }
    }

    /// Parses `url` and creates a request of type [`NavigationType::Other`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTarget`] if `url` does not parse.
    ///
    /// # Examples
    ///
    /// ```
    /// use nav_trust::NavigationRequest;
    ///
    /// let request = NavigationRequest::parse("https://example.com/login").unwrap();
    /// assert_eq!(request.host(), Some("example.com"));
    /// assert_eq!(request.port(), Some(443));
    /// assert!(request.is_secure());
    /// ```
    pub fn parse(url: &str) -> Result<Self, Error> {
        let url = Url::parse(url).map_err(|e| Error::InvalidTarget(format!("{url}: {e}")))?;
        Ok(Self::new(url, NavigationType::Other))
    }

    /// Returns a copy of this request with a different navigation type.
    pub fn with_type(mut self, navigation_type: NavigationType) -> Self {
        self.navigation_type = navigation_type;
        self
    }

    /// Returns the target URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns how the navigation was triggered.
    pub fn navigation_type(&self) -> NavigationType {
        self.navigation_type
    }

    /// Returns the target host, if the URL has one.
    pub fn host(&self) -> Option<&str> {
        self.url.host_str()
    }

    /// Returns the target port, falling back to the scheme's default.
    pub fn port(&self) -> Option<u16> {
        self.url.port_or_known_default()
    }

    /// Returns true if the target is reached over TLS.
    pub fn is_secure(&self) -> bool {
        self.url.scheme() == "https"
    }

    /// Returns true if `other` targets the same URL.
    ///
    /// The navigation type is ignored: a replayed load is usually reported
    /// by the surface as [`NavigationType::Other`].
    pub fn same_target(&self, other: &NavigationRequest) -> bool {
        self.url == other.url
    }
}

impl fmt::Display for NavigationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

/// Error reported by the rendering surface when a load fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadError {
    /// Platform error code
    pub code: i64,
    /// Human-readable description
    pub message: String,
}

impl LoadError {
    /// Creates a new load error.
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "load failed ({}): {}", self.code, self.message)
    }
}

/// Correlates log lines and audit records of one navigation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NavigationId(u64);

static NEXT_NAVIGATION_ID: AtomicU64 = AtomicU64::new(1);

impl NavigationId {
    pub(crate) fn next() -> Self {
        Self(NEXT_NAVIGATION_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[doc(hidden)]
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw numeric id.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NavigationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "nav-{}", self.0)
    }
}
