//! Maps a WebSocket upgrade path to the room it addresses.

use igvroom_protocol::{ProtocolError, RoomId};

/// Resolves `/api/rooms/<roomId>/websocket` or `/rooms/<roomId>`.
///
/// A trailing slash is tolerated. Anything else, including a syntactically
/// invalid room id, is an error.
pub fn room_id(path: &str) -> Result<RoomId, ProtocolError> {
    let trimmed = path.strip_suffix('/').unwrap_or(path);
    let segments: Vec<&str> = trimmed.split('/').collect();
    let raw = match segments.as_slice() {
        ["", "api", "rooms", id, "websocket"] => id,
        ["", "rooms", id] => id,
        _ => return Err(ProtocolError::InvalidRoomId(path.to_owned())),
    };
    RoomId::parse(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_path() {
        let id = room_id("/api/rooms/abc-123/websocket").unwrap();
        assert_eq!(id.as_str(), "abc-123");
    }

    #[test]
    fn test_short_path_and_trailing_slash() {
        assert_eq!(room_id("/rooms/doc_1").unwrap().as_str(), "doc_1");
        assert_eq!(room_id("/rooms/doc_1/").unwrap().as_str(), "doc_1");
    }

    #[test]
    fn test_unroutable_paths() {
        for path in [
            "/",
            "",
            "/rooms",
            "/rooms/",
            "/api/rooms/abc",
            "/api/rooms/abc/other",
            "/rooms/a/b",
            "/rooms/bad%20id",
            "/rooms/..",
        ] {
            assert!(room_id(path).is_err(), "{path} should not route");
        }
    }

    #[test]
    fn test_room_id_length_limit() {
        assert!(room_id(&format!("/rooms/{}", "a".repeat(64))).is_ok());
        assert!(room_id(&format!("/rooms/{}", "a".repeat(65))).is_err());
    }
}
