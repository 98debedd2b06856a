//! Authenticated session state.
//!
//! One writer (login/refresh), many readers (the connection loop stamps
//! every outbound command with the current token). Readers always take a
//! whole-struct [`SharedSession::snapshot`] so a concurrent refresh can
//! never hand out a half-updated token pair.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

/// The authenticated context backing both REST calls and the stream.
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// Bearer token for REST calls and outbound commands.
    pub access_token: String,
    /// Token exchanged for a new pair on refresh.
    pub refresh_token: String,
    /// Correlates outbound commands to this session (`mid` field).
    pub session_id: String,
    /// Cloud-side user id.
    pub user_id: String,
    /// Vendor API key discovered at login, sent as `x-api-key`.
    pub api_key: String,
    /// Unix seconds of the last login or successful refresh.
    pub last_refresh_ts: i64,
}

impl Session {
    /// A non-empty access token implies a successful login has occurred.
    pub fn is_authenticated(&self) -> bool {
        !self.access_token.is_empty()
    }

    /// Whether a refresh tick at `now` should actually refresh.
    pub fn refresh_due(&self, now: i64, max_age: Duration) -> bool {
        now - self.last_refresh_ts > i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX)
    }
}

/// Shared handle to the session, cloneable across tasks.
#[derive(Clone, Default)]
pub struct SharedSession {
    inner: Arc<RwLock<Session>>,
}

impl SharedSession {
    /// Create an empty, unauthenticated session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current session state.
    pub fn snapshot(&self) -> Session {
        self.inner.read().clone()
    }

    /// Whether a login has populated the session.
    pub fn is_authenticated(&self) -> bool {
        self.inner.read().is_authenticated()
    }

    /// Replace the whole session after a successful login.
    pub fn apply_login(&self, session: Session) {
        *self.inner.write() = session;
    }

    /// Replace the token pair after a successful refresh.
    pub fn apply_tokens(&self, access_token: String, refresh_token: String, now: i64) {
        let mut guard = self.inner.write();
        guard.access_token = access_token;
        guard.refresh_token = refresh_token;
        guard.last_refresh_ts = now;
    }

    /// Record that the token pair is known-good at `now` (set on connect).
    pub fn touch_refresh_ts(&self, now: i64) {
        self.inner.write().last_refresh_ts = now;
    }

    /// Roll the refresh timestamp back so the next tick forces a refresh.
    ///
    /// Used on the connection failure path as a defense against a
    /// stale-token-caused disconnect.
    pub fn force_refresh_due(&self, now: i64, max_age: Duration) {
        self.inner.write().last_refresh_ts =
            now - i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
