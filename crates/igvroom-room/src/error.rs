//! Error types for the room layer.

use igvroom_protocol::{ProtocolError, RoomId, SessionId};
use igvroom_session::SessionError;
use igvroom_store::StoreError;

/// Errors that can occur while a room processes an event.
///
/// None of these is fatal to the room. Errors raised while handling a
/// participant's frame are echoed back to that participant as
/// `{"error": "..."}`.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// A store call failed. In-memory and persisted state may now differ.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A frame could not be decoded or encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level failure (bad transition, dead transport).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// No session with this id is registered in the room.
    #[error("session {0} is not in the room")]
    SessionNotFound(SessionId),

    /// The room's actor has stopped or its command channel is closed.
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),
}
