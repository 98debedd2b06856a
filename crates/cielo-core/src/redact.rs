//! Token-safe serialization for log output.
//!
//! Commands carry the live access token and inbound frames can echo token
//! pairs back; anything written to the log goes through here first.

use serde_json::Value;

/// Replacement marker for sensitive values.
pub const REDACTED: &str = "*****";

const SENSITIVE_KEYS: [&str; 3] = ["token", "accessToken", "refreshToken"];

/// Return a copy of `value` with all sensitive fields masked, recursively.
pub fn redacted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, val) in map {
                let masked = if SENSITIVE_KEYS.contains(&key.as_str()) {
                    Value::String(REDACTED.to_string())
                } else {
                    redacted(val)
                };
                let _ = out.insert(key.clone(), masked);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(redacted).collect()),
        other => other.clone(),
    }
}

/// Serialize `value` for logging with sensitive fields masked.
pub fn redacted_string(value: &Value) -> String {
    redacted(value).to_string()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
