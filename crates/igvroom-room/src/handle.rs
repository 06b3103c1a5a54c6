//! Room actor: one Tokio task per live document.
//!
//! The actor owns a [`Room`] and processes commands from its channel one
//! at a time, which gives every room a single logical thread of control.
//! Connection drivers talk to it through a cloneable [`RoomHandle`].

use igvroom_protocol::{RoomId, ServerFrame, SessionId, SettingKey};
use igvroom_session::SessionSender;
use igvroom_store::Store;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::{Room, RoomConfig, RoomError, RoomInfo};

/// Commands sent to a room actor through its channel.
///
/// Variants carrying a `oneshot::Sender` expect a reply; the rest are
/// fire-and-forget.
pub(crate) enum RoomCommand {
    /// Register a new connection.
    Accept {
        sender: SessionSender,
        reply: oneshot::Sender<SessionId>,
    },

    /// An inbound frame from a connection.
    Frame { session_id: SessionId, data: Vec<u8> },

    /// The connection closed or failed.
    Close { session_id: SessionId },

    /// Broadcast a server-originated frame to everyone.
    Broadcast { frame: ServerFrame },

    GetSetting {
        key: SettingKey,
        reply: oneshot::Sender<Option<Value>>,
    },

    SetSetting {
        key: SettingKey,
        value: Value,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    GetInfo { reply: oneshot::Sender<RoomInfo> },

    /// Close every session and stop the actor.
    Shutdown,
}

/// Handle to a running room actor.
///
/// Cheap to clone: it wraps an `mpsc::Sender`. The registry keeps one per
/// room and every connection driver holds a clone.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// `true` once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Registers a connection and returns its session id. The snapshot is
    /// queued for it before this returns.
    pub async fn accept_session(&self, sender: SessionSender) -> Result<SessionId, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Accept { sender, reply }).await?;
        rx.await.map_err(|_| self.unavailable())
    }

    /// Forwards an inbound frame (fire-and-forget).
    pub async fn dispatch(&self, session_id: SessionId, data: Vec<u8>) -> Result<(), RoomError> {
        self.send(RoomCommand::Frame { session_id, data }).await
    }

    /// Reports that a connection closed or errored.
    pub async fn close_session(&self, session_id: SessionId) -> Result<(), RoomError> {
        self.send(RoomCommand::Close { session_id }).await
    }

    /// Broadcasts a frame to every session in the room.
    pub async fn broadcast(&self, frame: ServerFrame) -> Result<(), RoomError> {
        self.send(RoomCommand::Broadcast { frame }).await
    }

    pub async fn get_setting(&self, key: SettingKey) -> Result<Option<Value>, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::GetSetting { key, reply }).await?;
        rx.await.map_err(|_| self.unavailable())
    }

    /// Persists a setting without broadcasting it.
    pub async fn set_setting(&self, key: SettingKey, value: Value) -> Result<(), RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::SetSetting { key, value, reply }).await?;
        rx.await.map_err(|_| self.unavailable())?
    }

    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::GetInfo { reply }).await?;
        rx.await.map_err(|_| self.unavailable())
    }

    /// Tells the room to close its sessions and stop.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.send(RoomCommand::Shutdown).await
    }

    async fn send(&self, command: RoomCommand) -> Result<(), RoomError> {
        self.sender
            .send(command)
            .await
            .map_err(|_| self.unavailable())
    }

    fn unavailable(&self) -> RoomError {
        RoomError::Unavailable(self.room_id.clone())
    }
}

/// The actor loop. Runs until shutdown, until every handle is dropped, or
/// until the room has had no sessions for `idle_timeout`.
async fn run<S: Store>(mut room: Room<S>, mut receiver: mpsc::Receiver<RoomCommand>) {
    if let Err(e) = room.hydrate().await {
        tracing::warn!(room_id = %room.id(), error = %e, "failed to load settings");
    }
    tracing::info!(room_id = %room.id(), "room actor started");

    loop {
        let next = if room.is_empty() {
            let idle = room.config().idle_timeout;
            match tokio::time::timeout(idle, receiver.recv()).await {
                Ok(next) => next,
                Err(_) => {
                    tracing::debug!(room_id = %room.id(), "room idle");
                    break;
                }
            }
        } else {
            receiver.recv().await
        };
        let Some(command) = next else {
            break;
        };

        match command {
            RoomCommand::Accept { sender, reply } => {
                let id = room.accept_session(sender).await;
                let _ = reply.send(id);
            }
            RoomCommand::Frame { session_id, data } => {
                room.dispatch(session_id, &data).await;
            }
            RoomCommand::Close { session_id } => {
                if let Err(e) = room.close_session(session_id).await {
                    tracing::warn!(room_id = %room.id(), %session_id, error = %e, "close failed");
                }
            }
            RoomCommand::Broadcast { frame } => {
                if let Err(e) = room.broadcast(&frame, None) {
                    tracing::warn!(room_id = %room.id(), error = %e, "broadcast failed");
                }
            }
            RoomCommand::GetSetting { key, reply } => {
                let _ = reply.send(room.get_setting(key).cloned());
            }
            RoomCommand::SetSetting { key, value, reply } => {
                let _ = reply.send(room.set_setting(key, value).await);
            }
            RoomCommand::GetInfo { reply } => {
                let _ = reply.send(room.info());
            }
            RoomCommand::Shutdown => {
                room.close_all("Room closed.");
                break;
            }
        }
    }

    tracing::info!(room_id = %room.id(), "room actor stopped");
}

/// Spawns a room actor and returns a handle to it.
///
/// The actor loads persisted settings before it serves its first command.
pub fn spawn_room<S: Store>(room_id: RoomId, store: S, config: RoomConfig) -> RoomHandle {
    let (tx, rx) = mpsc::channel(config.command_channel_size.max(1));
    let room = Room::new(room_id.clone(), store, config);
    tokio::spawn(run(room, rx));
    RoomHandle {
        room_id,
        sender: tx,
    }
}
