//! Room registry: routes connections to the actor for their document.

use std::collections::HashMap;

use igvroom_protocol::RoomId;
use igvroom_store::StoreProvider;

use crate::handle::spawn_room;
use crate::{RoomConfig, RoomError, RoomHandle, RoomInfo};

/// Tracks one live actor per room id.
///
/// Rooms are created lazily on the first connection for an id. Actors stop
/// on their own once idle; stopped actors are dropped from the registry on
/// the next lookup and replaced on demand. Durable state lives in the
/// store, so nothing is lost.
pub struct RoomRegistry<P: StoreProvider> {
    rooms: HashMap<RoomId, RoomHandle>,
    provider: P,
    config: RoomConfig,
}

impl<P: StoreProvider> RoomRegistry<P> {
    pub fn new(provider: P, config: RoomConfig) -> Self {
        Self {
            rooms: HashMap::new(),
            provider,
            config,
        }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Returns the handle for `room_id`, spawning its actor if needed.
    pub fn get_or_create(&mut self, room_id: &RoomId) -> RoomHandle {
        self.prune();
        if let Some(handle) = self.rooms.get(room_id) {
            return handle.clone();
        }

        let store = self.provider.open(room_id);
        let handle = spawn_room(room_id.clone(), store, self.config.clone());
        self.rooms.insert(room_id.clone(), handle.clone());
        tracing::info!(%room_id, rooms = self.rooms.len(), "room created");
        handle
    }

    /// Forgets rooms whose actor has stopped. Returns how many were
    /// removed.
    pub fn prune(&mut self) -> usize {
        let before = self.rooms.len();
        self.rooms.retain(|_, handle| !handle.is_closed());
        let removed = before - self.rooms.len();
        if removed > 0 {
            tracing::debug!(removed, rooms = self.rooms.len(), "pruned stopped rooms");
        }
        removed
    }

    /// The handle for a live room, if any.
    pub fn get(&self, room_id: &RoomId) -> Option<RoomHandle> {
        self.rooms
            .get(room_id)
            .filter(|handle| !handle.is_closed())
            .cloned()
    }

    /// Returns info about a specific room.
    pub async fn room_info(&self, room_id: &RoomId) -> Result<RoomInfo, RoomError> {
        let handle = self
            .get(room_id)
            .ok_or_else(|| RoomError::Unavailable(room_id.clone()))?;
        handle.info().await
    }

    /// Shuts a room down and forgets it. Its sessions are closed.
    pub async fn shutdown_room(&mut self, room_id: &RoomId) -> Result<(), RoomError> {
        let handle = self
            .rooms
            .remove(room_id)
            .ok_or_else(|| RoomError::Unavailable(room_id.clone()))?;
        let _ = handle.shutdown().await;
        tracing::info!(%room_id, "room shut down");
        Ok(())
    }

    /// Shuts every room down.
    pub async fn shutdown_all(&mut self) {
        for (_, handle) in self.rooms.drain() {
            let _ = handle.shutdown().await;
        }
    }

    /// Cloned handles to every live room, for work done without holding
    /// the registry.
    pub fn room_handles(&self) -> Vec<RoomHandle> {
        self.rooms
            .values()
            .filter(|handle| !handle.is_closed())
            .cloned()
            .collect()
    }

    /// Number of rooms with a live actor.
    pub fn room_count(&self) -> usize {
        self.rooms.values().filter(|handle| !handle.is_closed()).count()
    }

    pub fn room_ids(&self) -> Vec<RoomId> {
        self.rooms
            .iter()
            .filter(|(_, handle)| !handle.is_closed())
            .map(|(room_id, _)| room_id.clone())
            .collect()
    }
}
