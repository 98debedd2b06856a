//! Vendor endpoints and protocol timing constants.

use std::time::Duration;

/// Base URL for REST calls.
pub const API_BASE_URL: &str = "https://api.smartcielo.com";

/// Base URL for the streaming WebSocket.
pub const WSS_BASE_URL: &str = "wss://apiwss.smartcielo.com";

/// Web application origin, also the target of API-key discovery.
pub const HOME_URL: &str = "https://home.cielowigle.com";

/// User agent sent on every request; the cloud rejects unknown agents.
pub const USER_AGENT: &str = "User-Agent: Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/109.0.0.0 Safari/537.36";

/// Inbound message type that is fanned out to listeners.
pub const STATE_UPDATE: &str = "StateUpdate";

/// Interval between refresh-timer ticks.
pub const REFRESH_TICK: Duration = Duration::from_secs(60);

/// Token age past which a refresh tick actually refreshes.
pub const TOKEN_MAX_AGE: Duration = Duration::from_secs(1200);

/// Interval between application-level keepalive pings.
pub const PING_INTERVAL: Duration = Duration::from_secs(588);

/// Grace period after a drop before listeners are told the connection is lost.
pub const CONNECTION_LOST_GRACE: Duration = Duration::from_secs(10);

/// Fixed wait between reconnection attempts.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Bounded wait for a single inbound frame.
pub const RECV_TIMEOUT: Duration = Duration::from_millis(100);

/// Yield between connection-loop iterations.
pub const LOOP_IDLE: Duration = Duration::from_millis(100);

/// How long `stop()` waits for the loop to observe the flags.
pub const STOP_GRACE: Duration = Duration::from_millis(500);

/// `limit` query parameter on the device listing call.
pub const DEVICE_LIST_LIMIT: u32 = 420;
