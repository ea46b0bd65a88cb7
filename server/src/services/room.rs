//! Room membership and fan-out.
//!
//! DESIGN
//! ======
//! One room per note, created on first join and pruned when the last
//! connection leaves. Broadcast is best-effort: a slow consumer with a
//! full channel misses the message rather than stalling the sender; the
//! document itself is safe in Postgres and reloads on reconnect.

#[cfg(test)]
#[path = "room_test.rs"]
mod tests;

use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;
use wire::ServerMessage;

use crate::state::AppState;

/// Add a connection to a note's room, creating the room if needed.
pub async fn join_room(
    state: &AppState,
    note_id: Uuid,
    client_id: Uuid,
    tx: mpsc::Sender<ServerMessage>,
) {
    let mut rooms = state.rooms.write().await;
    rooms.entry(note_id).or_default().clients.insert(client_id, tx);
    info!(%note_id, %client_id, "room: client joined");
}

/// Remove a connection from a note's room, pruning the room when empty.
pub async fn part_room(state: &AppState, note_id: Uuid, client_id: Uuid) {
    let mut rooms = state.rooms.write().await;
    let Some(room) = rooms.get_mut(&note_id) else {
        return;
    };
    room.clients.remove(&client_id);
    if room.clients.is_empty() {
        rooms.remove(&note_id);
        info!(%note_id, "room: pruned empty room");
    }
    info!(%note_id, %client_id, "room: client left");
}

/// Send a message to every room member except `exclude`.
pub async fn broadcast(
    state: &AppState,
    note_id: Uuid,
    message: &ServerMessage,
    exclude: Option<Uuid>,
) {
    let rooms = state.rooms.read().await;
    let Some(room) = rooms.get(&note_id) else {
        return;
    };
    for (client_id, tx) in &room.clients {
        if exclude == Some(*client_id) {
            continue;
        }
        // try_send: drop the message instead of blocking on a full channel.
        let _ = tx.try_send(message.clone());
    }
}
