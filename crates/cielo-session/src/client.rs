//! The `CieloClient` facade.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio::task::JoinHandle;

use cielo_auth::{ApiKeyDiscovery, AuthClient, AuthError, Session, SharedSession};
use cielo_core::types::unix_now;
use cielo_core::{CieloConfig, Device};

use crate::devices::DeviceClient;
use crate::dispatch::EventDispatcher;
use crate::errors::RestError;
use crate::listener::{EventListener, ListenerRegistry};
use crate::manager::{ConnectionManager, ConnectionState};
use crate::queue::{CommandStamper, OutboundQueue};

/// Entry point: owns the session, the queue, the listener registry and the
/// background tasks (connection manager and token refresher).
///
/// Typical lifecycle: [`CieloClient::login`], register listeners,
/// [`CieloClient::start`], enqueue commands with
/// [`CieloClient::send_action`], and eventually [`CieloClient::stop`].
pub struct CieloClient {
    config: CieloConfig,
    session: SharedSession,
    auth: Arc<AuthClient>,
    queue: Arc<OutboundQueue>,
    registry: Arc<ListenerRegistry>,
    devices: Arc<DeviceClient>,
    manager: Arc<ConnectionManager>,
    stamper: CommandStamper,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl CieloClient {
    /// Create a client with production API-key discovery.
    pub fn new(config: CieloConfig) -> Self {
        let session = SharedSession::new();
        let auth = Arc::new(AuthClient::new(config.clone(), session.clone()));
        Self::wire(config, session, auth)
    }

    /// Create a client with an injected API-key source.
    pub fn with_discovery(config: CieloConfig, discovery: Arc<dyn ApiKeyDiscovery>) -> Self {
        let session = SharedSession::new();
        let auth = Arc::new(AuthClient::with_discovery(
            config.clone(),
            session.clone(),
            discovery,
        ));
        Self::wire(config, session, auth)
    }

    fn wire(config: CieloConfig, session: SharedSession, auth: Arc<AuthClient>) -> Self {
        let queue = Arc::new(OutboundQueue::new());
        let registry = Arc::new(ListenerRegistry::new());
        let dispatcher = EventDispatcher::new(Arc::clone(&registry));
        let devices = Arc::new(DeviceClient::new(config.clone(), session.clone()));
        let manager = Arc::new(ConnectionManager::new(
            config.clone(),
            session.clone(),
            Arc::clone(&queue),
            dispatcher,
            Arc::clone(&devices),
        ));
        Self {
            config,
            session,
            auth,
            queue,
            registry,
            devices,
            manager,
            stamper: CommandStamper::new(),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// The shared session (read-only snapshots for callers).
    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    /// Log in. Must succeed before [`CieloClient::start`].
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, AuthError> {
        self.auth.login(username, password).await
    }

    /// Spawn the connection manager and the token refresher. No-op if
    /// already started.
    pub fn start(&self) {
        let mut tasks = self.tasks.lock();
        if !tasks.is_empty() {
            tracing::warn!("client already started");
            return;
        }
        tasks.push(tokio::spawn(Arc::clone(&self.manager).run()));
        tasks.push(self.auth.spawn_refresher());
    }

    /// Register a listener for the lifetime of the session.
    pub fn add_listener(&self, listener: Arc<dyn EventListener>) {
        self.registry.add(listener);
    }

    /// Stamp a command with `token`, `mid` and a strictly-increasing `ts`,
    /// then queue it for transmission.
    pub fn send_action(&self, mut command: Map<String, Value>) {
        let snap = self.session.snapshot();
        let _ = self.stamper.stamp(
            &mut command,
            &snap.access_token,
            &snap.session_id,
            unix_now(),
        );
        self.queue.enqueue(Value::Object(command));
    }

    /// Queue a raw JSON frame without stamping.
    pub fn send_json(&self, frame: Value) {
        self.queue.enqueue(frame);
    }

    /// List the account's devices.
    pub async fn devices(&self) -> Result<Vec<Device>, RestError> {
        self.devices.devices().await
    }

    /// List devices with appliance records joined in.
    pub async fn devices_with_appliances(&self) -> Result<Vec<Device>, RestError> {
        self.devices.devices_with_appliances().await
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.manager.state()
    }

    /// Stop cooperatively: flag the loop, wait the grace period, then drop
    /// the background tasks. No reconnect is attempted after this.
    pub async fn stop(&self) {
        self.manager.stop();
        tokio::time::sleep(self.config.stop_grace).await;
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use cielo_auth::StaticKey;
    use serde_json::json;

    use super::*;

    fn test_client() -> CieloClient {
        // Local endpoints so a spawned manager can never reach the vendor.
        let config = CieloConfig {
            api_base_url: "http://127.0.0.1:9".to_string(),
            wss_base_url: "ws://127.0.0.1:9".to_string(),
            home_url: "http://127.0.0.1:9".to_string(),
            ..CieloConfig::default()
        };
        let client =
            CieloClient::with_discovery(config, Arc::new(StaticKey("key".to_string())));
        client.session.apply_login(Session {
            access_token: "tok".to_string(),
            refresh_token: "rt".to_string(),
            session_id: "sid".to_string(),
            user_id: "uid".to_string(),
            api_key: "key".to_string(),
            last_refresh_ts: 1,
        });
        client
    }

    #[tokio::test]
    async fn send_action_stamps_and_queues() {
        let client = test_client();
        let command = json!({"action": "actionControl", "actionValue": "inc"})
            .as_object()
            .unwrap()
            .clone();
        client.send_action(command.clone());
        client.send_action(command);

        let queued = client.queue.drain_all();
        assert_eq!(queued.len(), 2);
        assert_eq!(queued[0]["token"], "tok");
        assert_eq!(queued[0]["mid"], "sid");
        let ts0 = queued[0]["ts"].as_i64().unwrap();
        let ts1 = queued[1]["ts"].as_i64().unwrap();
        assert!(ts1 > ts0);
    }

    #[tokio::test]
    async fn send_json_skips_stamping() {
        let client = test_client();
        client.send_json(json!({"message": "raw"}));
        let queued = client.queue.drain_all();
        assert!(queued[0].get("ts").is_none());
    }

    #[tokio::test]
    async fn start_is_idempotent() {
        let client = test_client();
        client.start();
        client.start();
        assert_eq!(client.tasks.lock().len(), 2);
        client.stop().await;
        assert!(client.tasks.lock().is_empty());
    }

    #[tokio::test]
    async fn stop_without_start_is_harmless() {
        let client = test_client();
        client.stop().await;
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }
}
