//! Outbound command queue and stamping.
//!
//! The queue is an unbounded FIFO: command volume is user-issued HVAC
//! actions, so delivery wins over backpressure. The connection loop drains
//! the whole queue each iteration; a mid-drain send failure puts the failed
//! command (and the not-yet-attempted tail) back at the front so it is
//! retried first.

use std::collections::VecDeque;

use parking_lot::Mutex;
use serde_json::{Map, Value};

/// Thread-safe FIFO of pending commands awaiting transmission.
#[derive(Default)]
pub struct OutboundQueue {
    inner: Mutex<VecDeque<Value>>,
}

impl OutboundQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command.
    pub fn enqueue(&self, command: Value) {
        self.inner.lock().push_back(command);
    }

    /// Atomically remove and return everything queued, in FIFO order.
    pub fn drain_all(&self) -> Vec<Value> {
        self.inner.lock().drain(..).collect()
    }

    /// Reinsert commands at the front, preserving their order.
    ///
    /// Used when a send fails mid-drain: the failed command plus the
    /// untransmitted tail go back ahead of anything enqueued since.
    pub fn requeue_front(&self, commands: Vec<Value>) {
        let mut guard = self.inner.lock();
        for command in commands.into_iter().rev() {
            guard.push_front(command);
        }
    }

    /// Number of pending commands.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

/// Injects `token`, `mid` and `ts` into outbound commands.
///
/// `ts` is the server-observed ordering field: it follows the wall clock
/// but is bumped to `previous + 1` whenever two commands land in the same
/// second, so consecutive values are strictly increasing.
#[derive(Default)]
pub struct CommandStamper {
    last_ts: Mutex<i64>,
}

impl CommandStamper {
    /// Create a stamper with no history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp a command in place. Returns the assigned `ts`.
    pub fn stamp(&self, command: &mut Map<String, Value>, token: &str, mid: &str, now: i64) -> i64 {
        let mut last = self.last_ts.lock();
        let ts = if now <= *last { *last + 1 } else { now };
        *last = ts;

        let _ = command.insert("token".to_string(), Value::String(token.to_string()));
        let _ = command.insert("mid".to_string(), Value::String(mid.to_string()));
        let _ = command.insert("ts".to_string(), Value::from(ts));
        ts
    }
}

/// The application-level keepalive command.
pub fn ping_command(token: &str) -> Value {
    serde_json::json!({
        "message": "Ping Connection Reset",
        "token": token,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
