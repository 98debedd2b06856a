//! Keepalive ping and connection-lost watchdog.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use cielo_auth::SharedSession;

use crate::dispatch::EventDispatcher;
use crate::queue::{OutboundQueue, ping_command};

enum WatchdogState {
    Idle,
    Armed(JoinHandle<()>),
    Fired,
}

/// Notifies listeners when an outage outlasts the grace window.
///
/// Armed the instant a connection attempt fails or an active connection
/// drops; cancelled as soon as a new connection reaches Connected. If the
/// grace window elapses first, every listener gets `on_connection_lost()`
/// exactly once, after which the watchdog is inert until cancelled.
/// Reconnects inside the window mean listeners never hear about the blip.
pub struct Watchdog {
    state: Arc<Mutex<WatchdogState>>,
    grace: Duration,
    dispatcher: EventDispatcher,
}

impl Watchdog {
    /// Create a disarmed watchdog.
    pub fn new(grace: Duration, dispatcher: EventDispatcher) -> Self {
        Self {
            state: Arc::new(Mutex::new(WatchdogState::Idle)),
            grace,
            dispatcher,
        }
    }

    /// Start the grace window. No-op while armed or already fired.
    pub fn arm(&self) {
        let mut state = self.state.lock();
        if !matches!(*state, WatchdogState::Idle) {
            return;
        }

        let shared = Arc::clone(&self.state);
        let dispatcher = self.dispatcher.clone();
        let grace = self.grace;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            *shared.lock() = WatchdogState::Fired;
            tracing::warn!(grace = ?grace, "connection not recovered, notifying listeners");
            dispatcher.dispatch_connection_lost();
        });
        *state = WatchdogState::Armed(handle);
    }

    /// Stop the window and reset. Called on reaching Connected.
    pub fn cancel(&self) {
        let mut state = self.state.lock();
        if let WatchdogState::Armed(handle) = &*state {
            handle.abort();
        }
        *state = WatchdogState::Idle;
    }

    /// Whether a grace window is currently running.
    pub fn is_armed(&self) -> bool {
        matches!(*self.state.lock(), WatchdogState::Armed(_))
    }

    /// Whether the current episode already notified listeners.
    pub fn has_fired(&self) -> bool {
        matches!(*self.state.lock(), WatchdogState::Fired)
    }
}

/// Spawn the keepalive task: every `interval`, enqueue an application-level
/// ping stamped with the current access token. Aborted when the connection
/// leaves the Connected state.
pub fn spawn_ping(
    queue: Arc<OutboundQueue>,
    session: SharedSession,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(interval);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first interval tick completes immediately; skip it so pings
        // start one full interval after connecting.
        let _ = tick.tick().await;
        loop {
            let _ = tick.tick().await;
            let token = session.snapshot().access_token;
            tracing::debug!("enqueueing keepalive ping");
            queue.enqueue(ping_command(&token));
        }
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
