//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding frames.
///
/// A `ProtocolError` is never fatal to a connection: the room reports it
/// back to the sender as an `{error}` frame and keeps the socket open.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a frame into JSON text).
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// The bytes were not valid JSON.
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// The frame is valid JSON but does not have the expected shape,
    /// e.g. an array instead of an object or a cursor with string
    /// coordinates.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// A room identifier was empty, too long or contained characters
    /// outside `[A-Za-z0-9_-]`.
    #[error("invalid room id: {0:?}")]
    InvalidRoomId(String),
}
