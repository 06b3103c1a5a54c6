//! Participant sessions for igvroom.
//!
//! A [`Session`] is one participant's connection as seen by the room that
//! owns it. This crate covers:
//!
//! 1. **Delivery**: the [`SessionSender`] / [`OutboundReceiver`] channel
//!    between the room and the task that owns the socket
//! 2. **Handshake state**: [`SessionState`], from `Connecting` to `Closed`
//! 3. **Identity**: display-name validation ([`validate_name`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Room Layer (above)     ← owns sessions, broadcasts through them
//!     ↕
//! Session Layer (this)   ← per-connection record and handshake state
//!     ↕
//! Protocol Layer (below) ← SessionId, WireFrame
//! ```

mod error;
mod session;

pub use error::SessionError;
pub use session::{
    outbound_channel, validate_name, Outbound, OutboundReceiver, Session,
    SessionSender, SessionState, MAX_NAME_LEN,
};
