use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use crate::error::{ApiError, Result};
use crate::request::RawResponse;

/// Decoding used by GET: the body must parse. Only a 204 may come without a
/// body; it decodes as JSON `null`, which `Option<_>` and `Value` accept and
/// structs reject.
pub fn decode_strict<T: DeserializeOwned>(raw: &RawResponse) -> Result<T> {
    if raw.status == StatusCode::NO_CONTENT {
        return serde_json::from_value(Value::Null)
            .map_err(|e| ApiError::Decode(format!("empty body: {e}")));
    }

    serde_json::from_slice(&raw.body).map_err(|e| {
        error!("Failed to parse JSON response: {}", e);
        ApiError::Decode(e.to_string())
    })
}

/// Decoding used by writes: anything that does not parse means "no content".
pub fn decode_lenient<T: DeserializeOwned>(raw: &RawResponse) -> Option<T> {
    if raw.is_no_content() {
        return None;
    }

    match serde_json::from_slice(&raw.body) {
        Ok(value) => Some(value),
        Err(err) => {
            debug!(status = %raw.status, error = %err, "Treating undecodable body as no content");
            None
        }
    }
}

/// Removes `key` from a decoded envelope.
pub fn take_field(mut envelope: Value, key: &str) -> Result<Value> {
    envelope
        .get_mut(key)
        .map(Value::take)
        .ok_or_else(|| ApiError::InvalidResponse(format!("missing `{key}` in response")))
}

/// Removes the array stored under `key` from a decoded envelope.
pub fn take_array(envelope: Value, key: &str) -> Result<Vec<Value>> {
    match take_field(envelope, key)? {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        other => Err(ApiError::InvalidResponse(format!(
            "`{key}` is not an array: {other}"
        ))),
    }
}
