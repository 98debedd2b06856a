//! Listener trait and registry.

use std::sync::Arc;

use parking_lot::RwLock;

use cielo_core::{Device, InboundEvent};

/// Observer of session events, typically one per appliance.
///
/// Listeners are registered once for the lifetime of the session; there is
/// no deregistration. Callbacks run on the connection task and should
/// return quickly.
pub trait EventListener: Send + Sync {
    /// MAC address of the appliance this listener represents; matches
    /// device snapshots to listeners.
    fn mac_address(&self) -> &str;

    /// An inbound `StateUpdate` arrived.
    fn on_state_update(&self, event: &InboundEvent);

    /// The connection stayed down past the watchdog window.
    fn on_connection_lost(&self);

    /// A device snapshot for this listener's MAC arrived after a reconnect.
    fn on_device_snapshot(&self, device: &Device);
}

/// Append-only list of registered listeners.
#[derive(Default)]
pub struct ListenerRegistry {
    inner: RwLock<Vec<Arc<dyn EventListener>>>,
}

impl ListenerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for the lifetime of the session.
    pub fn add(&self, listener: Arc<dyn EventListener>) {
        self.inner.write().push(listener);
    }

    /// Current listeners, in registration order.
    pub fn snapshot(&self) -> Vec<Arc<dyn EventListener>> {
        self.inner.read().clone()
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Whether no listeners are registered.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
