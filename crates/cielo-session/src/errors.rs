//! Session error types.
//!
//! Everything here is recovered locally: connection errors feed the
//! reconnect state machine and REST errors are surfaced to the caller of
//! the one-shot device calls. Neither tears the client down.

/// Socket-level failure on the streaming connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// The session has no tokens yet; log in first.
    #[error("not authenticated")]
    NotAuthenticated,

    /// Handshake or socket failure.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// A one-shot REST call failed.
#[derive(Debug, thiserror::Error)]
pub enum RestError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The cloud rejected the call.
    #[error("request rejected ({status}): {message}")]
    Rejected {
        /// HTTP or envelope status code.
        status: u16,
        /// Error description from the response.
        message: String,
    },

    /// The response did not have the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
