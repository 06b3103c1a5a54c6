//! JSON-file store backend.
//!
//! Each room is one file, `<data_dir>/<room_id>.json`, holding a single JSON
//! object of all the room's keys. The file is read on first access and
//! rewritten in full after every mutation (write to a temp file, then
//! rename) so a crash never leaves a half-written document behind.

use std::collections::{BTreeMap, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};

use igvroom_protocol::RoomId;
use serde_json::Value;
use tokio::sync::{Mutex, MutexGuard};

use crate::{select_range, ListOptions, Store, StoreError, StoreProvider};

type Entries = BTreeMap<String, Value>;

/// A partition persisted as one JSON file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    /// `None` until the file has been read.
    cache: Arc<Mutex<Option<Entries>>>,
}

impl FileStore {
    /// Opens the partition stored at `path`. Nothing is read until the
    /// first call.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Arc::new(Mutex::new(None)),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Locks the cache, loading the file on first use.
    async fn loaded(&self) -> Result<MutexGuard<'_, Option<Entries>>, StoreError> {
        let mut cache = self.cache.lock().await;
        if cache.is_none() {
            *cache = Some(read_entries(&self.path).await?);
        }
        Ok(cache)
    }

    async fn persist(&self, entries: &Entries) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        tracing::trace!(path = %self.path.display(), keys = entries.len(), "store persisted");
        Ok(())
    }
}

async fn read_entries(path: &Path) -> Result<Entries, StoreError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Entries::new()),
        Err(e) => Err(e.into()),
    }
}

impl Store for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let cache = self.loaded().await?;
        Ok(cache.as_ref().and_then(|entries| entries.get(key).cloned()))
    }

    async fn put(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut cache = self.loaded().await?;
        let entries = cache.get_or_insert_with(Entries::new);
        entries.insert(key.to_owned(), value);
        self.persist(entries).await
    }

    async fn delete(&self, keys: &[String]) -> Result<usize, StoreError> {
        let mut cache = self.loaded().await?;
        let entries = cache.get_or_insert_with(Entries::new);
        let removed = keys.iter().filter(|key| entries.remove(*key).is_some()).count();
        if removed > 0 {
            self.persist(entries).await?;
        }
        Ok(removed)
    }

    async fn list(
        &self,
        options: ListOptions,
    ) -> Result<Vec<(String, Value)>, StoreError> {
        let cache = self.loaded().await?;
        Ok(cache
            .as_ref()
            .map(|entries| select_range(entries, &options))
            .unwrap_or_default())
    }
}

/// Hands out one [`FileStore`] per room under a data directory.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
    open: Arc<StdMutex<HashMap<RoomId, FileStore>>>,
}

impl FileBackend {
    /// Stores rooms under `dir`, created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            open: Arc::default(),
        }
    }

    /// The data directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl StoreProvider for FileBackend {
    type Store = FileStore;

    fn open(&self, room_id: &RoomId) -> FileStore {
        let mut open = self
            .open
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        open.entry(room_id.clone())
            .or_insert_with(|| {
                FileStore::new(self.dir.join(format!("{}.json", room_id.as_str())))
            })
            .clone()
    }
}
