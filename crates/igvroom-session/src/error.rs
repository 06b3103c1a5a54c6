//! Error types for the session layer.

use igvroom_protocol::SessionId;

/// Errors that can occur while driving a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The identity handshake carried a name over the limit. Fatal to the
    /// connection only.
    #[error("Name too long.")]
    NameTooLong { len: usize, max: usize },

    /// The connection driver behind this session is gone; frames can no
    /// longer be delivered.
    #[error("session {0} transport is closed")]
    TransportClosed(SessionId),

    /// A state transition that the handshake machine does not allow.
    #[error("session {id}: cannot {action} while {state}")]
    InvalidTransition {
        id: SessionId,
        action: &'static str,
        state: crate::SessionState,
    },
}
