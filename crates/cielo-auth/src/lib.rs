//! # cielo-auth
//!
//! Authentication against the Cielo Home cloud:
//!
//! - [`discovery`]: scrapes the vendor `x-api-key` out of the web app's JS
//!   bundle, behind the narrow [`ApiKeyDiscovery`] seam
//! - [`client::AuthClient`]: login, token refresh, and the 60-second
//!   background refresher (refreshes once the pair is older than 20 minutes)
//! - [`session`]: the shared single-writer session store read by the
//!   connection loop on every outbound command
//!
//! Login failures are definitive ([`AuthError`]); refresh failures are
//! recovered locally ([`RefreshError`] is logged and retried next tick).

#![deny(unsafe_code)]

pub mod client;
pub mod discovery;
pub mod errors;
pub mod session;

pub use client::AuthClient;
pub use discovery::{ApiKeyDiscovery, StaticKey, WebAppDiscovery};
pub use errors::{AuthError, DiscoveryError, RefreshError};
pub use session::{Session, SharedSession};

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
