//! Session configuration.
//!
//! Loads configuration from environment variables with sensible defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Slack between the HTTP timeout and the reply wait.
pub const REPLY_MARGIN: Duration = Duration::from_secs(1);

/// Configuration for a [`BookingSession`](crate::BookingSession) backed by HTTP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// API base URL, without a trailing slash
    pub api_url: String,
    /// Per-request HTTP timeout
    pub http_timeout: Duration,
    /// How long a session call waits for its reply; see
    /// [`effective_reply_timeout`](Self::effective_reply_timeout)
    pub reply_timeout: Duration,
    /// `User-Agent` sent with every request
    pub user_agent: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:5000".to_string(),
            http_timeout: Duration::from_secs(10),
            reply_timeout: Duration::from_secs(15),
            user_agent: format!("bus-booking/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl SessionConfig {
    /// Load configuration from environment variables
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `BOOKING_API_URL` | `http://localhost:5000` |
    /// | `BOOKING_HTTP_TIMEOUT_SECS` | `10` |
    /// | `BOOKING_REPLY_TIMEOUT_SECS` | `15` |
    /// | `BOOKING_USER_AGENT` | `bus-booking/<version>` |
    ///
    /// Unparseable numbers fall back to the default.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let seconds = |key: &str, default: Duration| {
            lookup(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map_or(default, Duration::from_secs)
        };

        Self {
            api_url: lookup("BOOKING_API_URL")
                .map_or(defaults.api_url, |url| url.trim_end_matches('/').to_string()),
            http_timeout: seconds("BOOKING_HTTP_TIMEOUT_SECS", defaults.http_timeout),
            reply_timeout: seconds("BOOKING_REPLY_TIMEOUT_SECS", defaults.reply_timeout),
            user_agent: lookup("BOOKING_USER_AGENT").unwrap_or(defaults.user_agent),
        }
    }

    /// Reply wait used by the session
    ///
    /// At least `http_timeout` plus [`REPLY_MARGIN`], so a request always
    /// finishes (or times out in the transport) before its caller gives up.
    #[must_use]
    pub fn effective_reply_timeout(&self) -> Duration {
        self.reply_timeout
            .max(self.http_timeout.saturating_add(REPLY_MARGIN))
    }

    /// Replace the API URL
    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into().trim_end_matches('/').to_string();
        self
    }
}
