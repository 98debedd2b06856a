//! Login and token refresh against the Cielo cloud.

use std::sync::Arc;

use serde::Deserialize;
use tokio::task::JoinHandle;

use cielo_core::types::unix_now;
use cielo_core::{ApiEnvelope, CieloConfig};

use crate::discovery::{ApiKeyDiscovery, WebAppDiscovery};
use crate::errors::{AuthError, RefreshError};
use crate::session::{Session, SharedSession};

/// Performs login and keeps the token pair fresh.
///
/// Holds the single writer side of [`SharedSession`]; everything else reads
/// snapshots.
pub struct AuthClient {
    http: reqwest::Client,
    config: CieloConfig,
    session: SharedSession,
    discovery: Arc<dyn ApiKeyDiscovery>,
}

impl AuthClient {
    /// Create an auth client with production web-scrape discovery.
    pub fn new(config: CieloConfig, session: SharedSession) -> Self {
        let http = reqwest::Client::new();
        let discovery = Arc::new(WebAppDiscovery::new(http.clone(), &config));
        Self {
            http,
            config,
            session,
            discovery,
        }
    }

    /// Create an auth client with an injected API-key source.
    pub fn with_discovery(
        config: CieloConfig,
        session: SharedSession,
        discovery: Arc<dyn ApiKeyDiscovery>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            session,
            discovery,
        }
    }

    /// The shared session this client writes to.
    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    /// Log in with user credentials.
    ///
    /// Runs API-key discovery, posts the credentials, and on success
    /// populates the shared session. A rejection is definitive; callers
    /// should not retry with the same credentials.
    #[tracing::instrument(skip_all)]
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, AuthError> {
        let api_key = self.discovery.discover().await?;

        let body = serde_json::json!({
            "user": {
                "userId": username,
                "password": password,
                "mobileDeviceId": "WEB",
                "deviceTokenId": "WEB",
                "appType": "WEB",
                "appVersion": "1.0",
                "timeZone": "America/Toronto",
                "mobileDeviceName": "chrome",
                "deviceType": "WEB",
                "ipAddress": "0.0.0.0",
                "isSmartHVAC": 0,
                "locale": "en",
            }
        });

        tracing::debug!("calling login endpoint");
        let resp = self
            .vendor_headers(
                self.http
                    .post(format!("{}/web/login", self.config.api_base_url)),
                &api_key,
            )
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status != 200 {
            let message = resp.text().await.unwrap_or_default();
            return Err(AuthError::Rejected { status, message });
        }

        let text = resp.text().await?;
        let envelope: ApiEnvelope<LoginData> = serde_json::from_str(&text)
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;
        if !envelope.is_success() {
            return Err(AuthError::Rejected {
                status: envelope.status,
                message: envelope.message,
            });
        }
        let user = envelope
            .data
            .ok_or_else(|| AuthError::MalformedResponse("missing user payload".to_string()))?
            .user;

        let session = Session {
            access_token: user.access_token,
            refresh_token: user.refresh_token,
            session_id: user.session_id,
            user_id: user.user_id,
            api_key,
            last_refresh_ts: unix_now(),
        };
        if !session.is_authenticated() {
            return Err(AuthError::MalformedResponse(
                "login succeeded without an access token".to_string(),
            ));
        }
        self.session.apply_login(session.clone());
        tracing::info!(user_id = %session.user_id, "login succeeded");
        Ok(session)
    }

    /// Exchange the refresh token for a new access/refresh pair.
    #[tracing::instrument(skip_all)]
    pub async fn refresh(&self) -> Result<(), RefreshError> {
        let snap = self.session.snapshot();
        if !snap.is_authenticated() {
            return Err(RefreshError::NotAuthenticated);
        }

        tracing::debug!("calling token refresh endpoint");
        let resp = self
            .vendor_headers(
                self.http
                    .get(format!("{}/web/token/refresh", self.config.api_base_url))
                    .query(&[("refreshToken", snap.refresh_token.as_str())]),
                &snap.api_key,
            )
            .header("authorization", &snap.access_token)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status != 200 {
            let message = resp.text().await.unwrap_or_default();
            return Err(RefreshError::Rejected { status, message });
        }

        let text = resp.text().await?;
        let envelope: ApiEnvelope<RefreshData> = serde_json::from_str(&text)
            .map_err(|e| RefreshError::MalformedResponse(e.to_string()))?;
        if !envelope.is_success() {
            return Err(RefreshError::Rejected {
                status: envelope.status,
                message: envelope.message,
            });
        }
        let tokens = envelope
            .data
            .ok_or_else(|| RefreshError::MalformedResponse("missing token payload".to_string()))?;

        self.session
            .apply_tokens(tokens.access_token, tokens.refresh_token, unix_now());
        tracing::debug!("token refresh succeeded");
        Ok(())
    }

    /// Spawn the background refresher.
    ///
    /// Ticks every `refresh_tick`; each tick refreshes iff the token pair is
    /// older than `token_max_age`. Failures are logged and left for the next
    /// tick — they never tear down an active connection.
    pub fn spawn_refresher(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(this.config.refresh_tick);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // An interval's first tick fires immediately; consume it so the
            // first check happens one full tick after login.
            let _ = tick.tick().await;
            loop {
                let _ = tick.tick().await;
                let snap = this.session.snapshot();
                if !snap.refresh_due(unix_now(), this.config.token_max_age) {
                    continue;
                }
                if let Err(e) = this.refresh().await {
                    tracing::warn!(error = %e, "token refresh failed, retrying next tick");
                }
            }
        })
    }

    fn vendor_headers(
        &self,
        builder: reqwest::RequestBuilder,
        api_key: &str,
    ) -> reqwest::RequestBuilder {
        builder
            .header("x-api-key", api_key)
            .header("referer", &self.config.home_url)
            .header("origin", &self.config.home_url)
            .header("user-agent", &self.config.user_agent)
    }
}

#[derive(Deserialize)]
struct LoginData {
    user: LoginUser,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginUser {
    access_token: String,
    refresh_token: String,
    session_id: String,
    user_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshData {
    access_token: String,
    refresh_token: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
