//! Unified error type for the igvroom server.

use igvroom_protocol::ProtocolError;
use igvroom_room::RoomError;
use igvroom_session::SessionError;
use igvroom_store::StoreError;
use igvroom_transport::TransportError;

/// Top-level error that wraps every layer's error.
///
/// The `#[from]` attribute on each variant lets `?` convert layer errors
/// automatically.
#[derive(Debug, thiserror::Error)]
pub enum IgvRoomError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (bad frame, bad room id).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A store backend error.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A room-level error (actor gone, store failure).
    #[error(transparent)]
    Room(#[from] RoomError),
}
