//! Generic event envelope decoding.
//!
//! Only the `type` discriminator and the `data` object are extracted; the
//! payload stays opaque JSON for downstream consumers. Callers must run this
//! after verification, never before.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DecodeError;

/// Minimal typed wrapper around a verified delivery body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Event discriminator, e.g. `order.filled`.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Opaque event payload.
    pub data: Map<String, Value>,
}

/// Decodes a verified body into an [`EventEnvelope`].
///
/// Fields other than `type` and `data` are ignored.
///
/// # Errors
///
/// - [`DecodeError::MissingType`] if `type` is absent or not a string.
/// - [`DecodeError::MalformedJson`] for invalid JSON, a non-object body, or
///   a missing or non-object `data`.
pub fn decode(body: &[u8]) -> Result<EventEnvelope, DecodeError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| DecodeError::malformed(e.to_string()))?;

    let Value::Object(mut object) = value else {
        return Err(DecodeError::malformed("body is not a JSON object"));
    };

    let event_type = match object.remove("type") {
        Some(Value::String(event_type)) => event_type,
        _ => return Err(DecodeError::MissingType),
    };

    let data = match object.remove("data") {
        Some(Value::Object(data)) => data,
        Some(_) => return Err(DecodeError::malformed("`data` is not a JSON object")),
        None => return Err(DecodeError::malformed("`data` field missing")),
    };

    Ok(EventEnvelope { event_type, data })
}
