//! Inbound and outbound frame shapes.
//!
//! Inbound frames are decoded up front into a [`ClientFrame`] variant and
//! dispatched by exhaustive match. Outbound frames are built as
//! [`ServerFrame`] values and encoded once per broadcast.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::codec::{self, WireFrame};
use crate::{CursorPosition, ProtocolError, SettingKey};

/// Display name given to participants that do not provide one.
pub const ANONYMOUS: &str = "anonymous";

// ---------------------------------------------------------------------------
// Client → Server
// ---------------------------------------------------------------------------

/// A decoded client frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientFrame {
    /// The first frame of a connection: who is this participant?
    Identity { name: String },

    /// One or more enumerated settings changed. `frame` is the frame as
    /// received, re-broadcast verbatim.
    SettingUpdate {
        updates: Vec<(SettingKey, Value)>,
        frame: Map<String, Value>,
    },

    /// The participant's pointer moved (or left the view).
    CursorUpdate {
        cursor: CursorPosition,
        frame: Map<String, Value>,
    },

    /// Anything else. Ignored without reply.
    Unknown,
}

impl ClientFrame {
    /// Decodes the identity handshake frame.
    ///
    /// Any JSON object completes the handshake; see [`resolve_name`] for how
    /// the `name` field is interpreted.
    ///
    /// # Errors
    /// Returns a [`ProtocolError`] if the bytes are not a JSON object.
    pub fn identity(data: &[u8]) -> Result<Self, ProtocolError> {
        let frame = codec::decode_object(data)?;
        Ok(ClientFrame::Identity {
            name: resolve_name(frame.get("name")),
        })
    }

    /// Decodes and classifies a frame from an identified participant.
    ///
    /// # Errors
    /// Returns a [`ProtocolError`] if the bytes are not a JSON object or
    /// the `cursor` field is not a `{x, y}` object of numbers or nulls.
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        Self::classify(codec::decode_object(data)?)
    }

    /// Classifies an already-parsed frame.
    ///
    /// Setting keys take precedence over `cursor`. Keys whose value is
    /// JSON `null` count as absent.
    pub fn classify(frame: Map<String, Value>) -> Result<Self, ProtocolError> {
        let updates: Vec<(SettingKey, Value)> = SettingKey::ALL
            .into_iter()
            .filter_map(|key| match frame.get(key.as_str()) {
                None | Some(Value::Null) => None,
                Some(value) => Some((key, value.clone())),
            })
            .collect();
        if !updates.is_empty() {
            return Ok(ClientFrame::SettingUpdate { updates, frame });
        }

        match frame.get("cursor") {
            None | Some(Value::Null) => Ok(ClientFrame::Unknown),
            Some(raw) => {
                let cursor: CursorPosition = serde_json::from_value(raw.clone())
                    .map_err(|e| {
                        ProtocolError::InvalidMessage(format!("invalid cursor: {e}"))
                    })?;
                Ok(ClientFrame::CursorUpdate { cursor, frame })
            }
        }
    }
}

/// Turns the handshake's `name` field into a display name.
///
/// A non-empty string is used as-is. A missing, `null`, `false`, zero or
/// empty value falls back to [`ANONYMOUS`]. Any other value is rendered as
/// JSON text.
pub fn resolve_name(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => ANONYMOUS.to_owned(),
        Some(Value::String(s)) if s.is_empty() => ANONYMOUS.to_owned(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => ANONYMOUS.to_owned(),
        Some(other) => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Server → Client
// ---------------------------------------------------------------------------

/// A frame sent by the room to one or more participants.
///
/// Serialized untagged: `ServerFrame::joined("Alice")` is
/// `{"joined":"Alice"}` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ServerFrame {
    /// A participant completed the identity handshake.
    Joined { joined: String },
    /// A participant disconnected.
    Quit { quit: String },
    /// Sent once to a participant right after its own handshake.
    Ready { ready: bool },
    /// Non-fatal error, sent only to the participant that caused it.
    Error { error: String },
    /// A settings object or a cursor frame.
    Object(Map<String, Value>),
}

impl ServerFrame {
    pub fn joined(name: impl Into<String>) -> Self {
        ServerFrame::Joined {
            joined: name.into(),
        }
    }

    pub fn quit(name: impl Into<String>) -> Self {
        ServerFrame::Quit { quit: name.into() }
    }

    pub fn ready() -> Self {
        ServerFrame::Ready { ready: true }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerFrame::Error {
            error: message.into(),
        }
    }

    /// The settings snapshot: every enumerated key, `null` when unset.
    pub fn settings<'a>(
        current: impl Fn(SettingKey) -> Option<&'a Value>,
    ) -> Self {
        let map = SettingKey::ALL
            .into_iter()
            .map(|key| {
                let value = current(key).cloned().unwrap_or(Value::Null);
                (key.as_str().to_owned(), value)
            })
            .collect();
        ServerFrame::Object(map)
    }

    /// A cursor broadcast: the client's frame with the server-assigned
    /// `name` and `timestamp` (epoch milliseconds) written over it.
    ///
    /// Server values win over client-supplied `name` and `timestamp`. That
    /// is the reverse of spreading the client frame over the server fields,
    /// and it is deliberate: the reaper trusts `timestamp` as write time.
    pub fn cursor(
        name: &str,
        timestamp: u64,
        mut frame: Map<String, Value>,
    ) -> Self {
        frame.insert("name".to_owned(), Value::String(name.to_owned()));
        frame.insert("timestamp".to_owned(), Value::from(timestamp));
        ServerFrame::Object(frame)
    }

    /// Encodes the frame to its wire form.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if serialization fails.
    pub fn encode(&self) -> Result<WireFrame, ProtocolError> {
        codec::encode(self)
    }

    /// Converts the frame into a JSON value, e.g. for persisting a cursor.
    pub fn into_value(self) -> Value {
        match self {
            ServerFrame::Joined { joined } => json_object("joined", joined.into()),
            ServerFrame::Quit { quit } => json_object("quit", quit.into()),
            ServerFrame::Ready { ready } => json_object("ready", ready.into()),
            ServerFrame::Error { error } => json_object("error", error.into()),
            ServerFrame::Object(map) => Value::Object(map),
        }
    }
}

fn json_object(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_owned(), value);
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn decode(value: Value) -> ClientFrame {
        ClientFrame::decode(value.to_string().as_bytes()).unwrap()
    }

    #[test]
    fn test_identity_uses_given_name() {
        let frame = ClientFrame::identity(br#"{"name":"Alice"}"#).unwrap();
        assert_eq!(frame, ClientFrame::Identity { name: "Alice".into() });
    }

    #[test]
    fn test_identity_defaults_to_anonymous() {
        for raw in [r#"{}"#, r#"{"name":""}"#, r#"{"name":null}"#, r#"{"name":false}"#] {
            let frame = ClientFrame::identity(raw.as_bytes()).unwrap();
            assert_eq!(
                frame,
                ClientFrame::Identity { name: ANONYMOUS.into() },
                "input {raw}"
            );
        }
    }

    #[test]
    fn test_identity_stringifies_other_values() {
        assert_eq!(resolve_name(Some(&json!(42))), "42");
        assert_eq!(resolve_name(Some(&json!(true))), "true");
    }

    #[test]
    fn test_identity_rejects_non_object() {
        assert!(ClientFrame::identity(b"\"Alice\"").is_err());
    }

    #[test]
    fn test_decode_setting_update() {
        let frame = decode(json!({ "locus": "chr1:1-100" }));
        match frame {
            ClientFrame::SettingUpdate { updates, frame } => {
                assert_eq!(updates, vec![(SettingKey::Locus, json!("chr1:1-100"))]);
                assert_eq!(frame["locus"], "chr1:1-100");
            }
            other => panic!("expected SettingUpdate, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_boolean_setting_false_is_an_update() {
        let frame = decode(json!({ "showTrackLabels": false }));
        assert!(matches!(
            frame,
            ClientFrame::SettingUpdate { ref updates, .. }
                if updates == &vec![(SettingKey::ShowTrackLabels, json!(false))]
        ));
    }

    #[test]
    fn test_decode_null_setting_is_unknown() {
        assert_eq!(decode(json!({ "locus": null })), ClientFrame::Unknown);
    }

    #[test]
    fn test_decode_cursor_update() {
        match decode(json!({ "cursor": { "x": 10, "y": 20 } })) {
            ClientFrame::CursorUpdate { cursor, .. } => {
                assert_eq!(cursor, CursorPosition::at(10, 20));
            }
            other => panic!("expected CursorUpdate, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_cleared_cursor() {
        match decode(json!({ "cursor": { "x": null, "y": null } })) {
            ClientFrame::CursorUpdate { cursor, .. } => assert!(cursor.is_cleared()),
            other => panic!("expected CursorUpdate, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_malformed_cursor_is_an_error() {
        let err = ClientFrame::decode(br#"{"cursor":{"x":"left","y":1}}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidMessage(_)));
    }

    #[test]
    fn test_decode_unknown_shape() {
        assert_eq!(decode(json!({ "chat": "hi" })), ClientFrame::Unknown);
    }

    #[test]
    fn test_server_frames_serialize_to_bare_objects() {
        assert_eq!(&*ServerFrame::joined("Alice").encode().unwrap(), r#"{"joined":"Alice"}"#);
        assert_eq!(&*ServerFrame::quit("Bob").encode().unwrap(), r#"{"quit":"Bob"}"#);
        assert_eq!(&*ServerFrame::ready().encode().unwrap(), r#"{"ready":true}"#);
        assert_eq!(&*ServerFrame::error("boom").encode().unwrap(), r#"{"error":"boom"}"#);
    }

    #[test]
    fn test_settings_frame_lists_every_key() {
        let locus = json!("chr2:5-50");
        let frame = ServerFrame::settings(|key| (key == SettingKey::Locus).then_some(&locus));
        let value = frame.into_value();
        assert_eq!(value["locus"], "chr2:5-50");
        assert_eq!(value["genome"], Value::Null);
        assert_eq!(value.as_object().unwrap().len(), SettingKey::ALL.len());
    }

    #[test]
    fn test_cursor_frame_overrides_client_name_and_timestamp() {
        let mut client = Map::new();
        client.insert("cursor".into(), json!({ "x": 1, "y": 2 }));
        client.insert("name".into(), json!("Mallory"));
        client.insert("timestamp".into(), json!(0));

        let value = ServerFrame::cursor("Alice", 1_700_000_000_000, client).into_value();
        assert_eq!(value["name"], "Alice");
        assert_eq!(value["timestamp"], 1_700_000_000_000u64);
        assert_eq!(value["cursor"], json!({ "x": 1, "y": 2 }));
    }
}
