//! The room: one shared document's coordinator.
//!
//! A [`Room`] owns the session registry (in join order), the settings
//! cache, and the document's store partition. Every method runs to
//! completion on the room's single logical thread; the only suspension
//! points are store calls.

use std::collections::BTreeMap;

use igvroom_protocol::{
    cursor_key, encode, ClientFrame, RoomId, ServerFrame, SessionId, SettingKey,
    WireFrame, CLOSE_GOING_AWAY, CLOSE_NAME_TOO_LONG,
};
use igvroom_session::{Session, SessionError, SessionSender, SessionState};
use igvroom_store::Store;
use serde_json::Value;

use crate::broadcast;
use crate::reaper::{now_millis, reap_cursors};
use crate::{RoomConfig, RoomError};

/// A snapshot of room metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    /// The room's identifier.
    pub room_id: RoomId,
    /// Registered sessions, identified or not.
    pub session_count: usize,
    /// Names of active participants, in join order.
    pub participants: Vec<String>,
}

/// Authoritative state for one shared document.
pub struct Room<S: Store> {
    id: RoomId,
    config: RoomConfig,
    store: S,
    sessions: Vec<Session>,
    settings: BTreeMap<SettingKey, Value>,
}

impl<S: Store> Room<S> {
    /// Creates an empty room over its store partition. Call
    /// [`hydrate`](Self::hydrate) to load persisted settings.
    pub fn new(id: RoomId, store: S, config: RoomConfig) -> Self {
        Self {
            id,
            config,
            store,
            sessions: Vec::new(),
            settings: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// `true` when no session is registered.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// The room's store partition.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Loads every persisted setting into the cache.
    pub async fn hydrate(&mut self) -> Result<(), RoomError> {
        for key in SettingKey::ALL {
            if let Some(value) = self.store.get(&key.storage_key()).await? {
                self.settings.insert(key, value);
            }
        }
        tracing::debug!(room_id = %self.id, settings = self.settings.len(), "room hydrated");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Settings
    // -----------------------------------------------------------------------

    /// Current value of a setting, if one was ever written.
    pub fn get_setting(&self, key: SettingKey) -> Option<&Value> {
        self.settings.get(&key)
    }

    /// Persists a setting, then updates the cache. Does not broadcast.
    pub async fn set_setting(&mut self, key: SettingKey, value: Value) -> Result<(), RoomError> {
        self.store.put(&key.storage_key(), value.clone()).await?;
        self.settings.insert(key, value);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Session registry
    // -----------------------------------------------------------------------

    /// Registers a new connection and queues its snapshot.
    ///
    /// The snapshot is, in order: one `{joined}` per distinct active
    /// participant, the settings object, and the fresh cursor entries. A
    /// store failure while reaping cursors queues an `{error}` frame in
    /// place of the cursors.
    pub async fn accept_session(&mut self, sender: SessionSender) -> SessionId {
        let mut session = Session::new(SessionId::next(), sender);
        let id = session.id();
        if let Err(e) = session.accept() {
            tracing::warn!(room_id = %self.id, session_id = %id, error = %e, "accept failed");
        }
        self.sessions.push(session);

        let snapshot = self.snapshot().await;
        if let Some(session) = self.session_mut(id) {
            for frame in snapshot {
                session.queue(frame);
            }
        }
        tracing::info!(room_id = %self.id, session_id = %id, sessions = self.sessions.len(), "session accepted");
        id
    }

    async fn snapshot(&self) -> Vec<WireFrame> {
        let mut roster: Vec<&str> = Vec::new();
        for name in self.sessions.iter().filter(|s| s.is_active()).filter_map(Session::name) {
            if !roster.contains(&name) {
                roster.push(name);
            }
        }

        let mut frames = Vec::new();
        let mut push = |frame: Result<WireFrame, _>| match frame {
            Ok(frame) => frames.push(frame),
            Err(e) => tracing::warn!(error = %e, "snapshot frame dropped"),
        };
        for name in roster {
            push(ServerFrame::joined(name).encode());
        }
        push(ServerFrame::settings(|key| self.settings.get(&key)).encode());

        match reap_cursors(&self.store, &self.config, now_millis()).await {
            Ok(reaped) => {
                for entry in &reaped.fresh {
                    push(encode(entry));
                }
            }
            Err(e) => {
                tracing::warn!(room_id = %self.id, error = %e, "cursor backlog unavailable");
                push(ServerFrame::error(e.to_string()).encode());
            }
        }
        frames
    }

    /// Routes one inbound frame through the handshake state machine.
    ///
    /// Failures are reported to the originating session only; its
    /// connection stays open.
    pub async fn dispatch(&mut self, id: SessionId, data: &[u8]) {
        let Some(state) = self.session(id).map(Session::state) else {
            tracing::debug!(room_id = %self.id, session_id = %id, "frame from unregistered session");
            return;
        };
        let result = match state {
            SessionState::AwaitingIdentity => self.handle_identity(id, data).await,
            SessionState::Active => self.handle_update(id, data).await,
            SessionState::Connecting | SessionState::Closed => Ok(()),
        };
        if let Err(e) = result {
            tracing::debug!(room_id = %self.id, session_id = %id, error = %e, "frame failed");
            self.report_error(id, &e);
        }
    }

    async fn handle_identity(&mut self, id: SessionId, data: &[u8]) -> Result<(), RoomError> {
        let ClientFrame::Identity { name } = ClientFrame::identity(data)? else {
            return Ok(());
        };
        let max_len = self.config.max_name_len;
        let index = self.position(id).ok_or(RoomError::SessionNotFound(id))?;

        match self.sessions[index].activate(name.clone(), max_len) {
            Ok(()) => {}
            Err(e @ SessionError::NameTooLong { .. }) => {
                let mut session = self.sessions.remove(index);
                let _ = session.send(ServerFrame::error(e.to_string()).encode()?);
                session.close(CLOSE_NAME_TOO_LONG, &e.to_string());
                tracing::info!(room_id = %self.id, session_id = %id, "rejected oversized name");
                return Ok(());
            }
            Err(SessionError::TransportClosed(_)) => {
                // Gone before it could see its snapshot; nobody knew it.
                self.sessions.remove(index).mark_quit();
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(room_id = %self.id, session_id = %id, %name, "participant joined");
        self.broadcast(&ServerFrame::joined(name), Some(id))?;
        self.send_to(id, &ServerFrame::ready())
    }

    async fn handle_update(&mut self, id: SessionId, data: &[u8]) -> Result<(), RoomError> {
        match ClientFrame::decode(data)? {
            ClientFrame::SettingUpdate { updates, frame } => {
                for (key, value) in updates {
                    self.set_setting(key, value).await?;
                }
                self.broadcast(&ServerFrame::Object(frame), None)
            }
            ClientFrame::CursorUpdate { cursor, frame } => {
                let name = self.active_name(id)?;
                let key = cursor_key(&name);
                let outbound = ServerFrame::cursor(&name, now_millis(), frame);
                if cursor.is_cleared() {
                    self.store.delete(&[key]).await?;
                    self.broadcast(&outbound, None)
                } else {
                    self.broadcast(&outbound, None)?;
                    self.store.put(&key, outbound.into_value()).await?;
                    Ok(())
                }
            }
            ClientFrame::Identity { .. } | ClientFrame::Unknown => {
                tracing::trace!(room_id = %self.id, session_id = %id, "ignoring unknown frame");
                Ok(())
            }
        }
    }

    /// Handles a transport close or error: unregisters the session and, if
    /// it had joined, clears its cursor and announces the departure.
    ///
    /// A session already evicted by a broadcast is ignored.
    pub async fn close_session(&mut self, id: SessionId) -> Result<(), RoomError> {
        let Some(index) = self.position(id) else {
            return Ok(());
        };
        let mut session = self.sessions.remove(index);
        session.mark_quit();
        tracing::info!(room_id = %self.id, session_id = %id, name = ?session.name(), "session closed");

        let Some(name) = session.name() else {
            return Ok(());
        };
        if let Err(e) = self.store.delete(&[cursor_key(name)]).await {
            tracing::warn!(room_id = %self.id, %name, error = %e, "failed to clear cursor");
        }
        self.broadcast(&ServerFrame::quit(name), None)
    }

    /// Fans `frame` out to every session except `exclude`, evicting dead
    /// ones.
    pub fn broadcast(
        &mut self,
        frame: &ServerFrame,
        exclude: Option<SessionId>,
    ) -> Result<(), RoomError> {
        broadcast::broadcast(&mut self.sessions, frame, exclude)?;
        Ok(())
    }

    /// Closes every session, e.g. when the room is shutting down.
    pub fn close_all(&mut self, reason: &str) {
        for mut session in self.sessions.drain(..) {
            session.close(CLOSE_GOING_AWAY, reason);
        }
    }

    pub fn info(&self) -> RoomInfo {
        RoomInfo {
            room_id: self.id.clone(),
            session_count: self.sessions.len(),
            participants: self
                .sessions
                .iter()
                .filter(|s| s.is_active())
                .filter_map(|s| s.name().map(str::to_owned))
                .collect(),
        }
    }

    /// State of a registered session; `None` once it left the registry.
    pub fn session_state(&self, id: SessionId) -> Option<SessionState> {
        self.session(id).map(Session::state)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn position(&self, id: SessionId) -> Option<usize> {
        self.sessions.iter().position(|s| s.id() == id)
    }

    fn session(&self, id: SessionId) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id() == id)
    }

    fn session_mut(&mut self, id: SessionId) -> Option<&mut Session> {
        self.sessions.iter_mut().find(|s| s.id() == id)
    }

    fn active_name(&self, id: SessionId) -> Result<String, RoomError> {
        self.session(id)
            .filter(|s| s.is_active())
            .and_then(Session::name)
            .map(str::to_owned)
            .ok_or(RoomError::SessionNotFound(id))
    }

    /// Sends to one session. A dead transport is evicted like in a
    /// broadcast, including the quit notice.
    fn send_to(&mut self, id: SessionId, frame: &ServerFrame) -> Result<(), RoomError> {
        let Some(index) = self.position(id) else {
            return Ok(());
        };
        if self.sessions[index].send(frame.encode()?).is_ok() {
            return Ok(());
        }
        let mut session = self.sessions.remove(index);
        session.mark_quit();
        match session.name() {
            Some(name) => self.broadcast(&ServerFrame::quit(name), None),
            None => Ok(()),
        }
    }

    fn report_error(&mut self, id: SessionId, error: &RoomError) {
        if let Err(e) = self.send_to(id, &ServerFrame::error(error.to_string())) {
            tracing::warn!(room_id = %self.id, session_id = %id, error = %e, "could not report error");
        }
    }
}
