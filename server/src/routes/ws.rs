//! WebSocket handler — join, save, and fan-out.
//!
//! DESIGN
//! ======
//! On upgrade the `?token=` credential is resolved to a user; a bad token
//! still upgrades and is then closed with [`AUTH_CLOSE_CODE`], so clients
//! read a structured close code instead of a bare HTTP error and can
//! prompt for re-auth rather than reconnecting.
//!
//! The connection loop `select!`s inbound frames against the
//! per-connection broadcast channel. Handlers are pure dispatch: they
//! validate ownership, call the note/room services, and return the one
//! reply owed to the sender. Messages are handled in arrival order; the
//! database transaction inside `apply_change_set` serializes concurrent
//! saves per note.

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;

use std::collections::HashMap;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;
use wire::{AUTH_CLOSE_CODE, ChangeSet, ClientMessage, ServerMessage};

use crate::services::note::{self, NoteError};
use crate::services::{room, session};
use crate::state::AppState;

pub async fn handle_ws(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    let user = match params.get("token") {
        Some(token) => match session::validate_session(&state.pool, token).await {
            Ok(user) => user,
            Err(e) => {
                tracing::error!(error = %e, "ws token validation failed");
                return (StatusCode::INTERNAL_SERVER_ERROR, "token validation error")
                    .into_response();
            }
        },
        None => None,
    };

    match user {
        Some(user) => ws.on_upgrade(move |socket| run_ws(socket, state, user.id)),
        None => ws.on_upgrade(reject_unauthorized),
    }
}

/// Complete the upgrade, then close with the auth rejection code.
async fn reject_unauthorized(mut socket: WebSocket) {
    let close = CloseFrame {
        code: AUTH_CLOSE_CODE,
        reason: "invalid or missing session token".into(),
    };
    let _ = socket.send(Message::Close(Some(close))).await;
}

async fn run_ws(mut socket: WebSocket, state: AppState, user_id: Uuid) {
    let client_id = Uuid::new_v4();

    // Per-connection channel for broadcasts from room peers.
    let (client_tx, mut client_rx) = mpsc::channel::<ServerMessage>(256);

    info!(%client_id, %user_id, "ws: client connected");

    // The note whose room this connection currently occupies.
    let mut current_note: Option<Uuid> = None;

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        let reply = process_text(
                            &state, &mut current_note, client_id, user_id, &client_tx, text.as_str(),
                        ).await;
                        if let Some(reply) = reply {
                            if send_message(&mut socket, client_id, &reply).await.is_err() {
                                break;
                            }
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(message) = client_rx.recv() => {
                if send_message(&mut socket, client_id, &message).await.is_err() {
                    break;
                }
            }
        }
    }

    if let Some(note_id) = current_note {
        room::part_room(&state, note_id, client_id).await;
    }
    info!(%client_id, "ws: client disconnected");
}

/// Parse and process one inbound text frame, returning the reply owed to
/// the sender. Broadcasts to peers happen inside; the caller owns only the
/// sender's socket.
async fn process_text(
    state: &AppState,
    current_note: &mut Option<Uuid>,
    client_id: Uuid,
    user_id: Uuid,
    client_tx: &mpsc::Sender<ServerMessage>,
    text: &str,
) -> Option<ServerMessage> {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            warn!(%client_id, error = %e, "ws: invalid inbound message");
            return Some(ServerMessage::Error {
                code: "E_BAD_MESSAGE".into(),
                message: format!("invalid json: {e}"),
                retryable: false,
            });
        }
    };

    match message {
        ClientMessage::JoinNote { note_id } => {
            handle_join(state, current_note, client_id, user_id, client_tx, note_id)
                .await
                .err()
        }
        ClientMessage::SaveChangeSet { note_id, change_set, thumbnail } => {
            match handle_save(
                state,
                *current_note,
                client_id,
                user_id,
                note_id,
                &change_set,
                thumbnail.as_deref(),
            )
            .await
            {
                Ok(()) => {
                    // Fan the payload out unmodified, excluding the submitter.
                    let broadcast = ServerMessage::ChangeSetBroadcast { change_set };
                    room::broadcast(state, note_id, &broadcast, Some(client_id)).await;
                    Some(ServerMessage::ChangeSetApplied {})
                }
                Err(reply) => Some(reply),
            }
        }
    }
}

/// Verify ownership and move the connection into the note's room.
async fn handle_join(
    state: &AppState,
    current_note: &mut Option<Uuid>,
    client_id: Uuid,
    user_id: Uuid,
    client_tx: &mpsc::Sender<ServerMessage>,
    note_id: Uuid,
) -> Result<(), ServerMessage> {
    if let Err(e) = note::assert_owner(&state.pool, note_id, user_id).await {
        warn!(%client_id, %note_id, error = %e, "ws: join rejected");
        return Err(ServerMessage::error_from(&e));
    }

    if let Some(old_note) = current_note.take() {
        room::part_room(state, old_note, client_id).await;
    }
    room::join_room(state, note_id, client_id, client_tx.clone()).await;
    *current_note = Some(note_id);
    Ok(())
}

/// Verify the reference and ownership, then apply the targeted merge.
async fn handle_save(
    state: &AppState,
    current_note: Option<Uuid>,
    client_id: Uuid,
    user_id: Uuid,
    note_id: Uuid,
    change_set: &ChangeSet,
    thumbnail: Option<&str>,
) -> Result<(), ServerMessage> {
    // The save must reference the joined note.
    if current_note != Some(note_id) {
        warn!(%client_id, %note_id, "ws: change-set for a note the client has not joined");
        return Err(ServerMessage::error_from(&NoteError::InvalidReference));
    }

    note::assert_owner(&state.pool, note_id, user_id)
        .await
        .map_err(|e| ServerMessage::error_from(&e))?;
    note::apply_change_set(&state.pool, note_id, change_set, thumbnail)
        .await
        .map_err(|e| ServerMessage::error_from(&e))?;

    info!(%client_id, %note_id, entries = change_set.len(), "ws: change-set applied");
    Ok(())
}

async fn send_message(
    socket: &mut WebSocket,
    client_id: Uuid,
    message: &ServerMessage,
) -> Result<(), ()> {
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            warn!(%client_id, error = %e, "ws: failed to serialize message");
            return Err(());
        }
    };
    if let ServerMessage::Error { code, message, .. } = message {
        warn!(%client_id, code, message, "ws: send error message");
    }
    socket.send(Message::Text(json.into())).await.map_err(|_| ())
}
