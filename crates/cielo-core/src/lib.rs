//! # cielo-core
//!
//! Shared building blocks for the Cielo Home cloud client:
//!
//! - [`config::CieloConfig`]: endpoint URLs and timing parameters
//! - [`types`]: REST envelope, inbound event and device payload types
//! - [`redact`]: token-safe serialization for log output
//!
//! No I/O lives here; the auth and session crates build on these types.

#![deny(unsafe_code)]

pub mod config;
pub mod constants;
pub mod redact;
pub mod types;

pub use config::CieloConfig;
pub use redact::{redacted, redacted_string};
pub use types::{ApiEnvelope, Appliance, Device, InboundEvent, unix_now};

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
