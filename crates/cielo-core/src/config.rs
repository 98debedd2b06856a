//! Client configuration.

use std::time::Duration;

use crate::constants;

/// Endpoint and timing configuration for the Cielo client.
///
/// Defaults match the vendor cloud. Tests point the URLs at local servers
/// and compress the durations; production code normally uses
/// [`CieloConfig::default`] unchanged.
#[derive(Clone, Debug)]
pub struct CieloConfig {
    /// Base URL for REST calls (`https://…`, no trailing slash).
    pub api_base_url: String,
    /// Base URL for the streaming WebSocket (`wss://…`, no trailing slash).
    pub wss_base_url: String,
    /// Web application origin; login page used for API-key discovery.
    pub home_url: String,
    /// User agent for both REST and WebSocket requests.
    pub user_agent: String,
    /// Interval between refresh-timer ticks.
    pub refresh_tick: Duration,
    /// Token age past which a refresh tick actually refreshes.
    pub token_max_age: Duration,
    /// Interval between application-level keepalive pings.
    pub ping_interval: Duration,
    /// Grace period before listeners are notified of a lost connection.
    pub connection_lost_grace: Duration,
    /// Fixed wait between reconnection attempts.
    pub reconnect_delay: Duration,
    /// Bounded wait for a single inbound frame.
    pub recv_timeout: Duration,
    /// Yield between connection-loop iterations.
    pub loop_idle: Duration,
    /// How long `stop()` waits for the loop to observe the stop flags.
    pub stop_grace: Duration,
    /// `limit` query parameter on the device listing call.
    pub device_list_limit: u32,
    /// Whether to fetch and dispatch a device snapshot after a reconnect.
    pub resync_on_reconnect: bool,
}

impl Default for CieloConfig {
    fn default() -> Self {
        Self {
            api_base_url: constants::API_BASE_URL.to_string(),
            wss_base_url: constants::WSS_BASE_URL.to_string(),
            home_url: constants::HOME_URL.to_string(),
            user_agent: constants::USER_AGENT.to_string(),
            refresh_tick: constants::REFRESH_TICK,
            token_max_age: constants::TOKEN_MAX_AGE,
            ping_interval: constants::PING_INTERVAL,
            connection_lost_grace: constants::CONNECTION_LOST_GRACE,
            reconnect_delay: constants::RECONNECT_DELAY,
            recv_timeout: constants::RECV_TIMEOUT,
            loop_idle: constants::LOOP_IDLE,
            stop_grace: constants::STOP_GRACE,
            device_list_limit: constants::DEVICE_LIST_LIMIT,
            resync_on_reconnect: true,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
