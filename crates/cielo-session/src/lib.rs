//! # cielo-session
//!
//! The authenticated, self-healing streaming session to the Cielo Home
//! cloud:
//!
//! - [`queue`]: FIFO of outbound commands with retry-first requeueing and
//!   strictly-increasing `ts` stamping
//! - [`listener`] / [`dispatch`]: append-only observer registry and the
//!   `StateUpdate` fan-out
//! - [`liveness`]: keepalive pings and the 10-second connection-lost
//!   watchdog
//! - [`manager`]: the reconnect state machine and receive/send loop
//! - [`devices`]: one-shot device/appliance REST calls and the
//!   post-reconnect snapshot resync
//! - [`client::CieloClient`]: the facade wiring it all together
//!
//! Transient network failures are absorbed by the reconnect cycle;
//! listeners only hear about outages that outlast the watchdog window.

#![deny(unsafe_code)]

pub mod client;
pub mod devices;
pub mod dispatch;
pub mod errors;
pub mod listener;
pub mod liveness;
pub mod manager;
pub mod queue;

pub use client::CieloClient;
pub use devices::DeviceClient;
pub use dispatch::EventDispatcher;
pub use errors::{ConnectionError, RestError};
pub use listener::{EventListener, ListenerRegistry};
pub use liveness::Watchdog;
pub use manager::{ConnectionManager, ConnectionState};
pub use queue::{CommandStamper, OutboundQueue, ping_command};

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
