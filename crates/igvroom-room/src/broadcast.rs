//! Broadcast engine: fan-out with dead-session eviction.
//!
//! Delivery runs in two passes over the registry. The first pass attempts
//! delivery to every session and only records failures. The second removes
//! the failed sessions. Quit notices for evicted participants are then
//! broadcast from a work queue, so a mass disconnect never recurses: each
//! follow-up round can only evict sessions that are still registered.

use std::collections::VecDeque;

use igvroom_protocol::{ProtocolError, ServerFrame, SessionId, WireFrame};
use igvroom_session::Session;

/// Delivers `frame` to every registered session except `exclude`.
///
/// Active sessions are sent to directly; sessions still awaiting identity
/// get the frame appended to their pending queue. Sessions whose transport
/// is gone are removed from `sessions` and marked quit.
///
/// Returns the names of evicted participants, in registry order.
pub(crate) fn fan_out(
    sessions: &mut Vec<Session>,
    frame: &WireFrame,
    exclude: Option<SessionId>,
) -> Vec<String> {
    let mut failed = Vec::new();
    for session in sessions.iter_mut() {
        if Some(session.id()) == exclude {
            continue;
        }
        if session.deliver(WireFrame::clone(frame)).is_err() {
            failed.push(session.id());
        }
    }
    if failed.is_empty() {
        return Vec::new();
    }

    let mut evicted = Vec::new();
    sessions.retain_mut(|session| {
        if !failed.contains(&session.id()) {
            return true;
        }
        session.mark_quit();
        tracing::debug!(session_id = %session.id(), name = ?session.name(), "evicted dead session");
        if let Some(name) = session.name() {
            evicted.push(name.to_owned());
        }
        false
    });
    evicted
}

/// Broadcasts `frame`, then one `{quit}` per evicted participant.
///
/// The frame is encoded once. Quit notices are processed breadth-first and
/// are never excluded from anyone.
pub(crate) fn broadcast(
    sessions: &mut Vec<Session>,
    frame: &ServerFrame,
    exclude: Option<SessionId>,
) -> Result<(), ProtocolError> {
    let mut queue = VecDeque::from([(frame.encode()?, exclude)]);
    while let Some((wire, exclude)) = queue.pop_front() {
        for name in fan_out(sessions, &wire, exclude) {
            queue.push_back((ServerFrame::quit(name).encode()?, None));
        }
    }
    Ok(())
}
