//! JSON codec for room frames.
//!
//! Every frame on the wire is a JSON object. Inbound bytes are decoded into
//! a [`serde_json::Map`] before classification so unknown keys survive and
//! setting updates can be re-broadcast verbatim. Outbound frames are encoded
//! once into a shared [`Arc<str>`] so a broadcast to N sessions serializes
//! the frame a single time.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::ProtocolError;

/// A frame encoded to its wire form, cheap to clone into many queues.
pub type WireFrame = Arc<str>;

/// Serializes a value into a wire frame.
///
/// # Errors
/// Returns [`ProtocolError::Encode`] if serialization fails.
pub fn encode<T: Serialize>(value: &T) -> Result<WireFrame, ProtocolError> {
    serde_json::to_string(value)
        .map(Arc::from)
        .map_err(ProtocolError::Encode)
}

/// Decodes raw bytes into a JSON object.
///
/// # Errors
/// - [`ProtocolError::Decode`] if the bytes are not JSON.
/// - [`ProtocolError::InvalidMessage`] if the JSON is not an object.
pub fn decode_object(data: &[u8]) -> Result<Map<String, Value>, ProtocolError> {
    let value: Value =
        serde_json::from_slice(data).map_err(ProtocolError::Decode)?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ProtocolError::InvalidMessage(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_produces_compact_json() {
        let frame = encode(&serde_json::json!({ "ready": true })).unwrap();
        assert_eq!(&*frame, r#"{"ready":true}"#);
    }

    #[test]
    fn test_decode_object_accepts_objects() {
        let map = decode_object(br#"{"locus":"chr1:1-100"}"#).unwrap();
        assert_eq!(map["locus"], "chr1:1-100");
    }

    #[test]
    fn test_decode_object_rejects_non_objects() {
        let err = decode_object(b"[1,2]").unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidMessage(_)));
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn test_decode_object_rejects_garbage() {
        let err = decode_object(b"{not json").unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
    }
}
