//! Inbound event fan-out.

use std::sync::Arc;

use cielo_core::constants::STATE_UPDATE;
use cielo_core::{Device, InboundEvent};

use crate::listener::ListenerRegistry;

/// Fans inbound messages out to the registered listeners.
#[derive(Clone)]
pub struct EventDispatcher {
    listeners: Arc<ListenerRegistry>,
}

impl EventDispatcher {
    /// Create a dispatcher over an injected registry.
    pub fn new(listeners: Arc<ListenerRegistry>) -> Self {
        Self { listeners }
    }

    /// Route one inbound event.
    ///
    /// Only `StateUpdate` messages are forwarded; every other type is
    /// decoded and ignored.
    pub fn dispatch(&self, event: &InboundEvent) {
        if event.message_type != STATE_UPDATE {
            return;
        }
        for listener in self.listeners.snapshot() {
            listener.on_state_update(event);
        }
    }

    /// Deliver a device snapshot to the listener with the matching MAC.
    ///
    /// Used once after a re-established connection to resynchronize state.
    pub fn dispatch_snapshot(&self, devices: &[Device]) {
        for listener in self.listeners.snapshot() {
            for device in devices {
                if device.mac_address == listener.mac_address() {
                    listener.on_device_snapshot(device);
                }
            }
        }
    }

    /// Tell every listener the connection is lost. Called only by the
    /// watchdog, at most once per outage episode.
    pub fn dispatch_connection_lost(&self) {
        for listener in self.listeners.snapshot() {
            listener.on_connection_lost();
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
