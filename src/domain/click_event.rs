//! Click event model for asynchronous click tracking.

use crate::utils::user_agent::{ClientInfo, UNKNOWN_LOCATION, classify};

/// An in-memory representation of a visit awaiting recording.
///
/// Passed from the redirect path to the background worker through a channel,
/// so the redirect never waits on analytics writes.
///
/// # Usage Flow
///
/// 1. Created on the redirect path with request metadata
/// 2. Queued with [`crate::domain::click_worker::ClickRecorder::record`] (non-blocking)
/// 3. Classified and recorded by the worker, which then bumps the counter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickEvent {
    pub code: String,
    pub ip: String,
    pub user_agent: Option<String>,
    pub location: Option<String>,
}

impl ClickEvent {
    /// Creates a new click event.
    ///
    /// # Arguments
    ///
    /// - `code` - The short code that was accessed
    /// - `ip` - Client IP address
    /// - `user_agent` - Optional User-Agent header
    /// - `location` - Optional geolocation label
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let event = ClickEvent::new("abc123", "192.168.1.1", Some("Mozilla/5.0"), None);
    /// ```
    pub fn new(
        code: impl Into<String>,
        ip: impl Into<String>,
        user_agent: Option<&str>,
        location: Option<&str>,
    ) -> Self {
        Self {
            code: code.into(),
            ip: ip.into(),
            user_agent: user_agent.map(str::to_string),
            location: location.map(str::to_string),
        }
    }

    /// Browser and device family of the visitor.
    pub fn client_info(&self) -> ClientInfo {
        classify(self.user_agent.as_deref())
    }

    /// Location label, `"Unknown"` when none was supplied.
    pub fn location(&self) -> &str {
        self.location
            .as_deref()
            .filter(|l| !l.is_empty())
            .unwrap_or(UNKNOWN_LOCATION)
    }
}
