//! Identifiers and shared-state types that travel on the wire.
//!
//! The room coordinator keeps two kinds of shared state for a document:
//! persisted **settings** (one value per [`SettingKey`]) and ephemeral
//! **cursors** (one [`CursorPosition`] per participant). Both are stored
//! under string keys in the room's partition of the durable store; the
//! helpers here own the key layout.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Number;

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Close codes
// ---------------------------------------------------------------------------

/// Close code sent when the identity handshake carries an oversized name.
pub const CLOSE_NAME_TOO_LONG: u16 = 1009;

/// Close code sent to a connection whose session was already evicted.
pub const CLOSE_BROKEN: u16 = 1011;

/// Close code sent when the upgrade path does not name a room.
pub const CLOSE_UNKNOWN_ROOM: u16 = 1008;

/// Close code sent to every session when its room shuts down.
pub const CLOSE_GOING_AWAY: u16 = 1001;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Longest accepted room identifier, in bytes.
pub const MAX_ROOM_ID_LEN: usize = 64;

/// Opaque identifier of a shared document (one room per document).
///
/// Rooms are addressed by whatever identifier the router hands us; we only
/// require it to be a short, URL-safe token so it can double as a storage
/// partition name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Validates and wraps a room identifier.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidRoomId`] unless the id is 1–64
    /// ASCII alphanumerics, `-` or `_`.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let valid = !raw.is_empty()
            && raw.len() <= MAX_ROOM_ID_LEN
            && raw
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        if valid {
            Ok(Self(raw.to_owned()))
        } else {
            Err(ProtocolError::InvalidRoomId(raw.to_owned()))
        }
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for RoomId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Counter for generating unique session IDs.
static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Server-side identifier for one participant connection.
///
/// Never sent to clients; participants are known to each other only by
/// their display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    /// Allocates a fresh, process-unique session id.
    pub fn next() -> Self {
        Self(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Storage key prefix for persisted settings.
pub const SETTING_PREFIX: &str = "setting:";

/// The shared view settings of a genome-browser document.
///
/// Only these keys are persisted and re-broadcast; any other key in an
/// inbound frame is carried along verbatim but never stored on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SettingKey {
    /// Current viewport, e.g. `"chr1:1-100"`.
    #[serde(rename = "locus")]
    Locus,
    /// Reference genome id, e.g. `"hg38"`.
    #[serde(rename = "genome")]
    Genome,
    /// Loaded track list.
    #[serde(rename = "tracks")]
    Tracks,
    #[serde(rename = "showCenterGuide")]
    ShowCenterGuide,
    #[serde(rename = "showCursorTrackingGuide")]
    ShowCursorTrackingGuide,
    #[serde(rename = "showTrackLabels")]
    ShowTrackLabels,
    #[serde(rename = "showSampleNames")]
    ShowSampleNames,
}

impl SettingKey {
    /// Every setting, in the order they appear in a snapshot.
    pub const ALL: [SettingKey; 7] = [
        SettingKey::Locus,
        SettingKey::Genome,
        SettingKey::Tracks,
        SettingKey::ShowCenterGuide,
        SettingKey::ShowCursorTrackingGuide,
        SettingKey::ShowTrackLabels,
        SettingKey::ShowSampleNames,
    ];

    /// The key as it appears in JSON frames.
    pub fn as_str(self) -> &'static str {
        match self {
            SettingKey::Locus => "locus",
            SettingKey::Genome => "genome",
            SettingKey::Tracks => "tracks",
            SettingKey::ShowCenterGuide => "showCenterGuide",
            SettingKey::ShowCursorTrackingGuide => "showCursorTrackingGuide",
            SettingKey::ShowTrackLabels => "showTrackLabels",
            SettingKey::ShowSampleNames => "showSampleNames",
        }
    }

    /// Looks up a setting by its wire name.
    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == name)
    }

    /// The key this setting is persisted under, `setting:<name>`.
    pub fn storage_key(self) -> String {
        format!("{SETTING_PREFIX}{}", self.as_str())
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Cursors
// ---------------------------------------------------------------------------

/// Storage key prefix for persisted cursor entries.
pub const CURSOR_PREFIX: &str = "cursor:";

/// Returns the key a participant's cursor is persisted under.
pub fn cursor_key(name: &str) -> String {
    format!("{CURSOR_PREFIX}{name}")
}

/// A participant's pointer position.
///
/// Coordinates are kept as [`Number`] so integer positions round-trip
/// without gaining a fractional part. A missing coordinate reads as null.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CursorPosition {
    #[serde(default)]
    pub x: Option<Number>,
    #[serde(default)]
    pub y: Option<Number>,
}

impl CursorPosition {
    /// A position with both coordinates set.
    pub fn at(x: impl Into<Number>, y: impl Into<Number>) -> Self {
        Self {
            x: Some(x.into()),
            y: Some(y.into()),
        }
    }

    /// `true` when either coordinate is null: the participant's pointer
    /// left the view and the entry must be removed, not stored.
    pub fn is_cleared(&self) -> bool {
        self.x.is_none() || self.y.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_id_accepts_url_safe_tokens() {
        let id = RoomId::parse("doc_1-abc").unwrap();
        assert_eq!(id.as_str(), "doc_1-abc");
        assert_eq!(id.to_string(), "doc_1-abc");

        let hex = "a".repeat(64);
        assert!(RoomId::parse(&hex).is_ok());
    }

    #[test]
    fn test_room_id_rejects_bad_input() {
        assert!(RoomId::parse("").is_err());
        assert!(RoomId::parse(&"a".repeat(65)).is_err());
        assert!(RoomId::parse("../etc").is_err());
        assert!(RoomId::parse("has space").is_err());
    }

    #[test]
    fn test_session_ids_are_unique() {
        let a = SessionId::next();
        let b = SessionId::next();
        assert_ne!(a, b);
        assert!(a.to_string().starts_with("S-"));
    }

    #[test]
    fn test_setting_key_wire_names_match_serde() {
        for key in SettingKey::ALL {
            let json = serde_json::to_value(key).unwrap();
            assert_eq!(json, key.as_str());
            assert_eq!(SettingKey::from_wire(key.as_str()), Some(key));
        }
        assert_eq!(SettingKey::from_wire("cursor"), None);
    }

    #[test]
    fn test_setting_storage_key() {
        assert_eq!(SettingKey::Locus.storage_key(), "setting:locus");
        assert_eq!(
            SettingKey::ShowTrackLabels.storage_key(),
            "setting:showTrackLabels"
        );
    }

    #[test]
    fn test_cursor_position_cleared_when_any_coordinate_null() {
        assert!(!CursorPosition::at(1, 2).is_cleared());
        let half = CursorPosition {
            x: Some(1.into()),
            y: None,
        };
        assert!(half.is_cleared());
        assert!(CursorPosition::default().is_cleared());
    }

    #[test]
    fn test_cursor_position_keeps_integer_coordinates() {
        let json = serde_json::to_string(&CursorPosition::at(10, 20)).unwrap();
        assert_eq!(json, r#"{"x":10,"y":20}"#);
    }
}
