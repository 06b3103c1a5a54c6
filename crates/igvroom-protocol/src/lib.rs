//! Wire protocol for igvroom.
//!
//! Clients and the room coordinator exchange JSON objects over one
//! WebSocket per participant:
//!
//! - **Identifiers** ([`RoomId`], [`SessionId`]) and the shared-state
//!   vocabulary ([`SettingKey`], [`CursorPosition`]) with their storage
//!   key layout.
//! - **Frames**: [`ClientFrame`] (decoded inbound variant) and
//!   [`ServerFrame`] (outbound).
//! - **Codec**: JSON encode/decode helpers and the shared [`WireFrame`].
//!
//! ```text
//! Transport (text) → Protocol (ClientFrame) → Room (state + broadcast)
//! ```

mod codec;
mod error;
mod frame;
mod types;

pub use codec::{decode_object, encode, WireFrame};
pub use error::ProtocolError;
pub use frame::{resolve_name, ClientFrame, ServerFrame, ANONYMOUS};
pub use types::{
    cursor_key, CursorPosition, RoomId, SessionId, SettingKey, CLOSE_BROKEN,
    CLOSE_GOING_AWAY, CLOSE_NAME_TOO_LONG, CLOSE_UNKNOWN_ROOM, CURSOR_PREFIX, MAX_ROOM_ID_LEN,
    SETTING_PREFIX,
};
