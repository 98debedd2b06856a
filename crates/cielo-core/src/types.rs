//! REST and streaming payload types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Response envelope wrapping every REST call.
///
/// A call succeeded only when the HTTP layer returned 200 **and**
/// `status == 200 && message == "SUCCESS"` inside the body.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    /// Application-level status code (usually mirrors the HTTP status).
    pub status: u16,
    /// `"SUCCESS"` on success, an error description otherwise.
    pub message: String,
    /// The payload; absent on most failures.
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    /// Whether the body-level status indicates success.
    pub fn is_success(&self) -> bool {
        self.status == 200 && self.message == "SUCCESS"
    }
}

/// A decoded inbound WebSocket frame.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    /// The `message_type` discriminator (empty when the field is missing).
    pub message_type: String,
    /// The full decoded JSON object.
    pub payload: Value,
}

impl InboundEvent {
    /// Decode a text frame. Malformed JSON yields `None` — inbound noise is
    /// dropped, never fatal.
    pub fn parse(text: &str) -> Option<Self> {
        let payload: Value = serde_json::from_str(text).ok()?;
        let message_type = payload
            .get("message_type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Some(Self {
            message_type,
            payload,
        })
    }
}

/// A device record from `GET /web/devices`.
///
/// Only the fields the client routes on are typed; the rest of the
/// vendor-controlled payload is carried verbatim in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// MAC address; matches listeners to devices.
    pub mac_address: String,
    /// Appliance id; joins the device to its appliance record.
    pub appliance_id: i64,
    /// Detailed appliance record, populated by the sync join.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appliance: Option<Appliance>,
    /// Remaining vendor fields, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An appliance record from `GET /web/sync/appliances/1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appliance {
    /// Appliance id; join key against [`Device::appliance_id`].
    pub appliance_id: i64,
    /// Remaining vendor fields, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Current Unix time in whole seconds.
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
