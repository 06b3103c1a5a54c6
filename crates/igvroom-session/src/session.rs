//! Session types: the server's record of one participant connection.
//!
//! A session tracks:
//! - WHERE to deliver frames (its [`SessionSender`])
//! - WHO the participant is (display name, unset until the handshake)
//! - WHAT it has missed while unidentified (the pending queue)
//! - WHETHER it is still part of the room

use std::collections::VecDeque;
use std::fmt;

use igvroom_protocol::{SessionId, WireFrame};
use tokio::sync::mpsc;

use crate::SessionError;

/// Default maximum display-name length, in UTF-16 code units.
pub const MAX_NAME_LEN: usize = 64;

// ---------------------------------------------------------------------------
// Outbound channel
// ---------------------------------------------------------------------------

/// An instruction for the connection driver that owns the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Write one text frame.
    Frame(WireFrame),
    /// Send a close frame and stop.
    Close { code: u16, reason: String },
}

/// Receiving half held by the connection driver.
pub type OutboundReceiver = mpsc::UnboundedReceiver<Outbound>;

/// The room's handle on a connection.
///
/// Sending never blocks. Once the connection driver has exited and dropped
/// its [`OutboundReceiver`], every send fails, which is how the room learns
/// that a transport is dead.
#[derive(Debug, Clone)]
pub struct SessionSender {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl SessionSender {
    /// `true` once the receiving side is gone.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn push(&self, outbound: Outbound) -> bool {
        self.tx.send(outbound).is_ok()
    }
}

/// Creates the outbound channel for a new connection.
pub fn outbound_channel() -> (SessionSender, OutboundReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (SessionSender { tx }, rx)
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Handshake state of a session.
///
/// ```text
///   Connecting ──(accept)──→ AwaitingIdentity ──(first frame)──→ Active
///        │                          │                              │
///        └──────────────────────────┴──(close / error / evict)─────┴──→ Closed
/// ```
///
/// `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    AwaitingIdentity,
    Active,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Connecting => "connecting",
            SessionState::AwaitingIdentity => "awaiting identity",
            SessionState::Active => "active",
            SessionState::Closed => "closed",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One participant's connection as seen by its room.
///
/// Owned exclusively by the room's registry; a session that has quit has
/// already been removed from it.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    name: Option<String>,
    state: SessionState,
    /// Frames held back until the handshake completes ("no secret lurking").
    pending: VecDeque<WireFrame>,
    sender: SessionSender,
    quit: bool,
}

impl Session {
    /// Creates a session for a freshly upgraded connection.
    pub fn new(id: SessionId, sender: SessionSender) -> Self {
        Self {
            id,
            name: None,
            state: SessionState::Connecting,
            pending: VecDeque::new(),
            sender,
            quit: false,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// The display name, set by the identity handshake.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// `true` once the identity handshake has completed.
    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    pub fn is_quit(&self) -> bool {
        self.quit
    }

    /// Frames waiting for the handshake, oldest first.
    pub fn pending(&self) -> impl Iterator<Item = &WireFrame> {
        self.pending.iter()
    }

    /// `Connecting → AwaitingIdentity`.
    pub fn accept(&mut self) -> Result<(), SessionError> {
        self.transition(SessionState::Connecting, SessionState::AwaitingIdentity, "accept")
    }

    /// Appends a frame to the pending queue.
    pub fn queue(&mut self, frame: WireFrame) {
        self.pending.push_back(frame);
    }

    /// Sends a frame straight to the transport, bypassing the queue.
    ///
    /// # Errors
    /// [`SessionError::TransportClosed`] if the connection driver is gone.
    pub fn send(&self, frame: WireFrame) -> Result<(), SessionError> {
        if self.sender.push(Outbound::Frame(frame)) {
            Ok(())
        } else {
            Err(SessionError::TransportClosed(self.id))
        }
    }

    /// Delivers a broadcast frame: sent if active, queued if still
    /// awaiting identity.
    pub fn deliver(&mut self, frame: WireFrame) -> Result<(), SessionError> {
        if self.is_active() {
            self.send(frame)
        } else {
            self.queue(frame);
            Ok(())
        }
    }

    /// Completes the identity handshake: `AwaitingIdentity → Active`.
    ///
    /// Validates `name`, flushes the pending queue in FIFO order and marks
    /// the session active.
    ///
    /// # Errors
    /// - [`SessionError::NameTooLong`] if `name` exceeds `max_len`
    ///   UTF-16 code units. The session is left unnamed.
    /// - [`SessionError::InvalidTransition`] if not awaiting identity.
    /// - [`SessionError::TransportClosed`] if the flush hit a dead
    ///   connection.
    pub fn activate(&mut self, name: String, max_len: usize) -> Result<(), SessionError> {
        if self.state != SessionState::AwaitingIdentity {
            return Err(SessionError::InvalidTransition {
                id: self.id,
                action: "activate",
                state: self.state,
            });
        }
        validate_name(&name, max_len)?;

        while let Some(frame) = self.pending.pop_front() {
            self.send(frame)?;
        }
        self.name = Some(name);
        self.state = SessionState::Active;
        tracing::debug!(session_id = %self.id, name = ?self.name(), "session active");
        Ok(())
    }

    /// Asks the connection driver to close the socket and moves to
    /// `Closed`. A dead transport is ignored; it is closed already.
    pub fn close(&mut self, code: u16, reason: &str) {
        let _ = self.sender.push(Outbound::Close {
            code,
            reason: reason.to_owned(),
        });
        self.state = SessionState::Closed;
        self.pending.clear();
    }

    /// Marks the session as gone from the room.
    pub fn mark_quit(&mut self) {
        self.quit = true;
        self.state = SessionState::Closed;
        self.pending.clear();
    }

    fn transition(
        &mut self,
        from: SessionState,
        to: SessionState,
        action: &'static str,
    ) -> Result<(), SessionError> {
        if self.state != from {
            return Err(SessionError::InvalidTransition {
                id: self.id,
                action,
                state: self.state,
            });
        }
        self.state = to;
        Ok(())
    }
}

/// Checks a display name against the length limit.
///
/// Length is counted in UTF-16 code units, the way browser clients measure
/// strings: a character outside the Basic Multilingual Plane counts twice.
pub fn validate_name(name: &str, max_len: usize) -> Result<(), SessionError> {
    let len = name.encode_utf16().count();
    if len > max_len {
        return Err(SessionError::NameTooLong { len, max: max_len });
    }
    Ok(())
}
