//! Room coordination for igvroom.
//!
//! Every shared document is a room: a single-threaded actor that owns the
//! participant sessions, the document's settings, and the cursor backlog
//! in its store partition.
//!
//! # Key types
//!
//! - [`Room`]: the coordinator state machine, usable without an actor
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`RoomRegistry`]: one live actor per room id
//! - [`RoomConfig`]: name limit, cursor TTL and backlog size

mod broadcast;
mod config;
mod error;
mod handle;
mod reaper;
mod registry;
mod room;

pub use config::RoomConfig;
pub use error::RoomError;
pub use handle::{spawn_room, RoomHandle};
pub use reaper::{is_stale, now_millis, reap_cursors, Reaped};
pub use registry::RoomRegistry;
pub use room::{Room, RoomInfo};
