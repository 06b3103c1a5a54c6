//! Durable key-value storage for igvroom rooms.
//!
//! Each room gets its own partition ([`StoreProvider::open`]) holding the
//! room's persisted settings (`setting:<name>`) and cursor entries
//! (`cursor:<participant>`). Values are arbitrary JSON.
//!
//! # Backends
//!
//! - [`MemoryBackend`]: process-local, lost on restart. Used by tests and
//!   as the server default.
//! - [`FileBackend`]: one JSON document per room in a data directory,
//!   rewritten atomically on every mutation.

mod error;
mod file;
mod memory;

pub use error::StoreError;
pub use file::{FileBackend, FileStore};
pub use memory::{MemoryBackend, MemoryStore};

use std::future::Future;

use igvroom_protocol::RoomId;
use serde_json::Value;

/// Options for [`Store::list`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Only keys starting with this prefix are returned.
    pub prefix: String,
    /// Return keys in descending order.
    pub reverse: bool,
    /// Maximum number of entries. `None` means unbounded.
    pub limit: Option<usize>,
}

impl ListOptions {
    /// Lists every key under `prefix` in ascending order.
    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    /// Switches to descending key order.
    pub fn reverse(mut self) -> Self {
        self.reverse = true;
        self
    }

    /// Caps the number of returned entries.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// One room's partition of the durable store.
///
/// Every call is a suspension point for the room; the room processes no
/// other event until the call resolves.
pub trait Store: Send + Sync + 'static {
    /// Reads one key.
    fn get(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<Value>, StoreError>> + Send;

    /// Writes one key, replacing any previous value.
    fn put(
        &self,
        key: &str,
        value: Value,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Deletes a batch of keys in one operation. Returns how many existed.
    fn delete(
        &self,
        keys: &[String],
    ) -> impl Future<Output = Result<usize, StoreError>> + Send;

    /// Lists entries in key order.
    fn list(
        &self,
        options: ListOptions,
    ) -> impl Future<Output = Result<Vec<(String, Value)>, StoreError>> + Send;
}

/// Hands out the store partition for a room.
pub trait StoreProvider: Send + Sync + 'static {
    /// The partition type.
    type Store: Store;

    /// Opens (or creates) the partition for `room_id`.
    fn open(&self, room_id: &RoomId) -> Self::Store;
}

/// Applies [`ListOptions`] to an ordered map. Shared by both backends.
pub(crate) fn select_range(
    entries: &std::collections::BTreeMap<String, Value>,
    options: &ListOptions,
) -> Vec<(String, Value)> {
    let matching = entries
        .range(options.prefix.clone()..)
        .take_while(|(key, _)| key.starts_with(&options.prefix))
        .map(|(key, value)| (key.clone(), value.clone()));
    let limit = options.limit.unwrap_or(usize::MAX);
    if options.reverse {
        let mut all: Vec<_> = matching.collect();
        all.reverse();
        all.truncate(limit);
        all
    } else {
        matching.take(limit).collect()
    }
}
