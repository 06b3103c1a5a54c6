//! # igvroom
//!
//! Real-time collaboration server for shared genome-browser sessions.
//!
//! Every document is a room. Participants connect over WebSocket, announce
//! a display name, and from then on see each other's view settings and
//! cursors as they change. Settings persist across restarts; cursors
//! expire on their own.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use igvroom::prelude::*;
//!
//! # async fn run() -> Result<(), IgvRoomError> {
//! let server = IgvRoomServerBuilder::new()
//!     .bind("0.0.0.0:8787")
//!     .build(MemoryBackend::new())
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
pub mod route;
mod server;

pub use error::IgvRoomError;
pub use server::{IgvRoomServer, IgvRoomServerBuilder};

/// Commonly used types, re-exported.
pub mod prelude {
    pub use crate::{IgvRoomError, IgvRoomServer, IgvRoomServerBuilder};
    pub use igvroom_protocol::{ClientFrame, RoomId, ServerFrame, SessionId, SettingKey};
    pub use igvroom_room::{Room, RoomConfig, RoomHandle, RoomInfo, RoomRegistry};
    pub use igvroom_store::{FileBackend, MemoryBackend, Store, StoreProvider};
}
