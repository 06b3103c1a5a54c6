//! Per-connection driver: routing, room registration, frame pumping.
//!
//! Each accepted connection gets its own Tokio task running this driver.
//! The flow is:
//!   1. Complete the WebSocket upgrade, bounded by the handshake timeout
//!   2. Resolve the upgrade path to a room, or close with 1008
//!   3. Register a session with the room's actor
//!   4. Loop: forward inbound frames to the room, write outbound frames
//!   5. Tell the room the session is gone

use std::sync::Arc;

use igvroom_protocol::{RoomId, SessionId, CLOSE_BROKEN, CLOSE_UNKNOWN_ROOM};
use igvroom_room::{RoomError, RoomHandle};
use igvroom_session::{outbound_channel, Outbound, OutboundReceiver, SessionSender};
use igvroom_store::StoreProvider;
use igvroom_transport::{Connection, Upgrade, WebSocketConnection, WebSocketUpgrade};

use crate::route;
use crate::server::ServerState;
use crate::IgvRoomError;

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<P: StoreProvider>(
    upgrade: WebSocketUpgrade,
    state: Arc<ServerState<P>>,
) -> Result<(), IgvRoomError> {
    let peer = upgrade.peer_addr();
    let conn = upgrade.upgrade().await.inspect_err(|e| {
        tracing::debug!(%peer, error = %e, "handshake failed");
    })?;
    let conn_id = conn.id();
    let room_id = match route::room_id(conn.request_path()) {
        Ok(room_id) => room_id,
        Err(e) => {
            tracing::debug!(%conn_id, path = conn.request_path(), "unroutable path");
            let _ = conn.close(CLOSE_UNKNOWN_ROOM, "Unknown room.").await;
            return Err(e.into());
        }
    };

    let (sender, mut outbound) = outbound_channel();
    let (room, session_id) = join_room(&state, &room_id, &sender).await?;
    drop(sender);
    tracing::debug!(%conn_id, %room_id, %session_id, "connection joined room");

    let result = pump(&conn, &room, session_id, &mut outbound).await;

    // Runs on every exit path; a no-op if the room already evicted us.
    if let Err(e) = room.close_session(session_id).await {
        tracing::debug!(%session_id, error = %e, "room gone before close");
    }
    result
}

/// Registers the session with the room's actor.
///
/// An idle actor may stop between the registry lookup and the accept. The
/// registry then hands out a fresh actor, so one retry is enough.
async fn join_room<P: StoreProvider>(
    state: &ServerState<P>,
    room_id: &RoomId,
    sender: &SessionSender,
) -> Result<(RoomHandle, SessionId), IgvRoomError> {
    let mut retried = false;
    loop {
        let room = state.rooms.lock().await.get_or_create(room_id);
        match room.accept_session(sender.clone()).await {
            Ok(session_id) => return Ok((room, session_id)),
            Err(RoomError::Unavailable(_)) if !retried => {
                tracing::debug!(%room_id, "room stopped while joining; retrying");
                retried = true;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Moves frames in both directions until either side ends the session.
async fn pump(
    conn: &WebSocketConnection,
    room: &RoomHandle,
    session_id: SessionId,
    outbound: &mut OutboundReceiver,
) -> Result<(), IgvRoomError> {
    loop {
        tokio::select! {
            inbound = conn.recv() => match inbound? {
                Some(data) => room.dispatch(session_id, data).await?,
                None => {
                    tracing::debug!(%session_id, "connection closed by peer");
                    return Ok(());
                }
            },
            next = outbound.recv() => match next {
                Some(Outbound::Frame(frame)) => conn.send(&frame).await?,
                Some(Outbound::Close { code, reason }) => {
                    let _ = conn.close(code, &reason).await;
                    return Ok(());
                }
                None => {
                    tracing::debug!(%session_id, "room dropped session");
                    let _ = conn.close(CLOSE_BROKEN, "WebSocket broken.").await;
                    return Ok(());
                }
            },
        }
    }
}
