use std::fmt;

use crate::request::NavigationId;

/// Logger bound to a single navigation attempt.
///
/// Every event carries the `navigation_id` and `host` fields, so all lines
/// about one attempt (interception, certificate checks, replay or drop) can
/// be correlated.
#[derive(Debug, Clone, Copy)]
pub struct NavigationLog<'a> {
    navigation_id: NavigationId,
    host: &'a str,
}

impl<'a> NavigationLog<'a> {
    /// Creates a logger for navigation `navigation_id` to `host`.
    pub fn new(navigation_id: NavigationId, host: &'a str) -> Self {
        Self {
            navigation_id,
            host,
        }
    }

    /// Returns the navigation id attached to every event.
    pub fn navigation_id(&self) -> NavigationId {
        self.navigation_id
    }

    /// Logs an info-level message.
    ///
    /// ```
    /// # use nav_trust::NavigationLog;
    /// # fn example(log: &NavigationLog) {
    /// log.info(format_args!("replaying {}", "https://example.com/"));
    /// # }
    /// ```
    pub fn info(&self, args: fmt::Arguments<'_>) {
        tracing::info!(navigation_id = %self.navigation_id, host = %self.host, "{}", args);
    }

    /// Logs a warning-level message.
    pub fn warn(&self, args: fmt::Arguments<'_>) {
        tracing::warn!(navigation_id = %self.navigation_id, host = %self.host, "{}", args);
    }

    /// Logs a debug-level message.
    pub fn debug(&self, args: fmt::Arguments<'_>) {
        tracing::debug!(navigation_id = %self.navigation_id, host = %self.host, "{}", args);
    }
}
