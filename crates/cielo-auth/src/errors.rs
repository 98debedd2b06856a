//! Auth error types.
//!
//! The three failure classes propagate differently: [`DiscoveryError`] and
//! [`AuthError`] surface to the caller as definitive login failures, while
//! [`RefreshError`] is logged and retried on the next refresh tick.

/// API-key discovery against the web application failed.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The login page or bundle no longer carries the expected markers.
    #[error("API key not found: {context}")]
    KeyNotFound {
        /// Which scrape step came up empty.
        context: String,
    },
}

/// Login was rejected or could not complete. Definitive — never retried
/// automatically.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API-key discovery failed before login could be attempted.
    #[error("discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),

    /// The cloud rejected the credentials.
    #[error("login rejected ({status}): {message}")]
    Rejected {
        /// HTTP or envelope status code.
        status: u16,
        /// Error description from the response.
        message: String,
    },

    /// The response did not have the expected shape.
    #[error("malformed login response: {0}")]
    MalformedResponse(String),
}

/// Token refresh failed. Recovered locally: logged and retried on the next
/// 60-second tick, never tearing down an active connection.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The cloud rejected the refresh token.
    #[error("refresh rejected ({status}): {message}")]
    Rejected {
        /// HTTP or envelope status code.
        status: u16,
        /// Error description from the response.
        message: String,
    },

    /// The response did not have the expected shape.
    #[error("malformed refresh response: {0}")]
    MalformedResponse(String),

    /// Refresh was attempted before a successful login.
    #[error("no session to refresh")]
    NotAuthenticated,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
