//! Connection manager — the reconnect state machine and receive/send loop.
//!
//! One long-lived task owns the socket. Inside the Connected state the loop
//! alternates a bounded receive, a full queue drain, and a short yield, so
//! outbound commands are serviced even when the server is quiet and a stop
//! request is observed within one iteration.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use parking_lot::RwLock;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use cielo_auth::SharedSession;
use cielo_core::types::unix_now;
use cielo_core::{CieloConfig, InboundEvent, redacted_string};

use crate::devices::DeviceClient;
use crate::dispatch::EventDispatcher;
use crate::errors::ConnectionError;
use crate::liveness::{Watchdog, spawn_ping};
use crate::queue::OutboundQueue;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

/// Lifecycle of the streaming connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No socket open and not currently trying.
    Disconnected,
    /// Handshake in progress.
    Connecting,
    /// Steady-state receive/send loop.
    Connected,
    /// Waiting the fixed delay before the next attempt.
    ReconnectWait,
    /// Terminal; entered by `stop()`.
    Closed,
}

/// How the connected loop ended.
enum LoopExit {
    /// `stop()` flipped the running flag.
    Stopped,
    /// The server sent a close frame or ended the stream.
    ServerClosed,
}

/// Owns the WebSocket and drives the reconnect cycle until stopped.
///
/// Exactly one physical connection is open at a time. The watchdog is owned
/// here exclusively; no other component arms or cancels it.
pub struct ConnectionManager {
    config: CieloConfig,
    session: SharedSession,
    queue: Arc<OutboundQueue>,
    dispatcher: EventDispatcher,
    devices: Arc<DeviceClient>,
    watchdog: Watchdog,
    state: RwLock<ConnectionState>,
    running: AtomicBool,
    stop_requested: AtomicBool,
}

impl ConnectionManager {
    /// Wire up a manager. Nothing connects until [`ConnectionManager::run`].
    pub fn new(
        config: CieloConfig,
        session: SharedSession,
        queue: Arc<OutboundQueue>,
        dispatcher: EventDispatcher,
        devices: Arc<DeviceClient>,
    ) -> Self {
        let watchdog = Watchdog::new(config.connection_lost_grace, dispatcher.clone());
        Self {
            config,
            session,
            queue,
            dispatcher,
            devices,
            watchdog,
            state: RwLock::new(ConnectionState::Disconnected),
            running: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Request a cooperative stop. The loop observes the flags at the next
    /// iteration boundary; callers wait the configured stop grace.
    pub fn stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
    }

    /// Run the connect/reconnect cycle until stopped.
    pub async fn run(self: Arc<Self>) {
        let mut first_connect = true;
        loop {
            if self.stop_requested.load(Ordering::SeqCst) {
                break;
            }
            self.set_state(ConnectionState::Connecting);
            self.running.store(true, Ordering::SeqCst);

            match self.connect().await {
                Ok(ws) => {
                    self.set_state(ConnectionState::Connected);
                    self.watchdog.cancel();
                    tracing::info!("websocket connected");

                    let ping = spawn_ping(
                        Arc::clone(&self.queue),
                        self.session.clone(),
                        self.config.ping_interval,
                    );
                    if !first_connect && self.config.resync_on_reconnect {
                        if let Err(e) = self.devices.resync(&self.dispatcher).await {
                            tracing::warn!(error = %e, "device resync failed");
                        }
                    }
                    // The handshake proved the token pair good just now.
                    self.session.touch_refresh_ts(unix_now());

                    let exit = self.drive(ws).await;
                    ping.abort();
                    match exit {
                        Ok(LoopExit::Stopped) => {
                            tracing::debug!("stop requested, leaving connection loop");
                        }
                        Ok(LoopExit::ServerClosed) => {
                            tracing::debug!("server closed the connection");
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "connection failed");
                            self.session
                                .force_refresh_due(unix_now(), self.config.token_max_age);
                        }
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "connection attempt failed");
                    self.session
                        .force_refresh_due(unix_now(), self.config.token_max_age);
                }
            }

            first_connect = false;
            if self.stop_requested.load(Ordering::SeqCst) {
                break;
            }

            self.set_state(ConnectionState::Disconnected);
            self.watchdog.arm();
            self.set_state(ConnectionState::ReconnectWait);
            tracing::debug!(delay = ?self.config.reconnect_delay, "reconnecting after delay");
            tokio::time::sleep(self.config.reconnect_delay).await;
        }

        self.set_state(ConnectionState::Closed);
        tracing::debug!("connection manager closed");
    }

    async fn connect(&self) -> Result<WsStream, ConnectionError> {
        let snap = self.session.snapshot();
        if !snap.is_authenticated() {
            return Err(ConnectionError::NotAuthenticated);
        }
        let url = format!(
            "{}/websocket/?sessionId={}&token={}",
            self.config.wss_base_url, snap.session_id, snap.access_token,
        );
        tracing::debug!(session_id = %snap.session_id, "opening websocket");
        let (ws, _) = connect_async(&url).await?;
        Ok(ws)
    }

    /// The Connected-state loop: bounded receive, full queue drain, yield.
    async fn drive(&self, ws: WsStream) -> Result<LoopExit, ConnectionError> {
        let (mut sink, mut stream) = ws.split();
        let exit = loop {
            if !self.running.load(Ordering::SeqCst) {
                break Ok(LoopExit::Stopped);
            }
            match tokio::time::timeout(self.config.recv_timeout, stream.next()).await {
                // No frame within the bounded wait; fall through to sends.
                Err(_) => {}
                Ok(None) => break Ok(LoopExit::ServerClosed),
                Ok(Some(Err(e))) => break Err(e.into()),
                Ok(Some(Ok(Message::Close(frame)))) => {
                    tracing::debug!(?frame, "close frame received");
                    break Ok(LoopExit::ServerClosed);
                }
                Ok(Some(Ok(Message::Text(text)))) => {
                    if let Some(event) = InboundEvent::parse(text.as_str()) {
                        tracing::debug!(frame = %redacted_string(&event.payload), "frame received");
                        self.dispatcher.dispatch(&event);
                    }
                }
                // Protocol-level ping/pong and binary frames carry nothing to route.
                Ok(Some(Ok(_))) => {}
            }

            self.send_pending(&mut sink).await;
            tokio::time::sleep(self.config.loop_idle).await;
        };
        // Best-effort close handshake; the peer may already be gone.
        if let Err(e) = sink.close().await {
            tracing::debug!(error = %e, "close handshake failed");
        }
        exit
    }

    /// Transmit everything queued, in order. A failure requeues the failed
    /// command and the untransmitted tail; already-sent commands are never
    /// retried. Non-fatal: the receive side decides whether the connection
    /// is actually gone.
    async fn send_pending(&self, sink: &mut WsSink) {
        let mut pending = self.queue.drain_all();
        for i in 0..pending.len() {
            tracing::debug!(frame = %redacted_string(&pending[i]), "sending frame");
            if let Err(e) = sink.send(Message::Text(pending[i].to_string().into())).await {
                tracing::error!(error = %e, "send failed, requeueing command");
                self.queue.requeue_front(pending.split_off(i));
                return;
            }
        }
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.write() = state;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
