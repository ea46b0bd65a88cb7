//! REST loader and websocket session loop.
//!
//! ARCHITECTURE
//! ============
//! A [`NoteSession`] owns the canvas engine, the autosave machine, and
//! the socket. The loop `select!`s inbound server messages against a
//! coarse debounce tick: broadcasts merge into the store through
//! [`canvas::engine::Engine::apply_remote`] (which stages nothing, so a
//! peer's edit never re-arms the debounce), and an elapsed tick flushes
//! the pending change-set with a freshly rendered thumbnail. Exactly one
//! save is outstanding at a time; the submission snapshot is kept so the
//! ack can clear precisely those entries.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::time::{Duration, Instant};

use canvas::engine::Engine;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use uuid::Uuid;
use wire::{AUTH_CLOSE_CODE, ChangeSet, ClientMessage, NoteSnapshot, ServerMessage};

use crate::sync::Autosave;
use crate::thumbnail::{THUMBNAIL_PX, render_thumbnail, thumbnail_data_url};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("missing session token; pass --token or set CANVAS_SESSION_TOKEN")]
    MissingToken,
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("websocket error: {0}")]
    Ws(Box<tungstenite::Error>),
    #[error("websocket closed")]
    WsClosed,
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("authentication rejected; obtain a fresh session token")]
    AuthRejected,
    #[error("server rejected the request ({code}): {message}")]
    Server { code: String, message: String },
    #[error("thumbnail encode failed: {0}")]
    Thumbnail(#[from] image::ImageError),
    #[error("timed out waiting for the save to settle")]
    Timeout,
}

impl From<tungstenite::Error> for ClientError {
    fn from(error: tungstenite::Error) -> Self {
        Self::Ws(Box::new(error))
    }
}

/// Load the initial note snapshot over REST.
pub async fn fetch_note(
    base_url: &str,
    token: &str,
    note_id: Uuid,
) -> Result<NoteSnapshot, ClientError> {
    let url = format!("{}/api/notes/{note_id}", base_url.trim_end_matches('/'));
    let response = reqwest::Client::new().get(url).bearer_auth(token).send().await?;
    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(ClientError::AuthRejected);
    }
    if !status.is_success() {
        return Err(ClientError::Server {
            code: format!("HTTP {}", status.as_u16()),
            message: response.text().await.unwrap_or_default(),
        });
    }
    Ok(response.json::<NoteSnapshot>().await?)
}

/// List the caller's notes (metadata only, no stroke payloads).
pub async fn list_notes(base_url: &str, token: &str) -> Result<serde_json::Value, ClientError> {
    let url = format!("{}/api/notes", base_url.trim_end_matches('/'));
    let response = reqwest::Client::new().get(url).bearer_auth(token).send().await?;
    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(ClientError::AuthRejected);
    }
    if !status.is_success() {
        return Err(ClientError::Server {
            code: format!("HTTP {}", status.as_u16()),
            message: response.text().await.unwrap_or_default(),
        });
    }
    Ok(response.json().await?)
}

/// Websocket endpoint with the session token as a query parameter.
fn ws_url(base_url: &str, token: &str) -> Result<String, ClientError> {
    if let Some(rest) = base_url.strip_prefix("http://") {
        return Ok(format!("ws://{rest}/api/ws?token={token}"));
    }
    if let Some(rest) = base_url.strip_prefix("https://") {
        return Ok(format!("wss://{rest}/api/ws?token={token}"));
    }
    Err(ClientError::InvalidBaseUrl(base_url.to_owned()))
}

/// Map a close frame to the error the caller should see. The broker uses
/// a dedicated close code for credential rejection.
fn close_error(frame: Option<CloseFrame>) -> ClientError {
    match frame {
        Some(frame) if u16::from(frame.code) == AUTH_CLOSE_CODE => ClientError::AuthRejected,
        _ => ClientError::WsClosed,
    }
}

/// Dispatch one server message against the engine and autosave machine.
fn apply_server_message(
    engine: &mut Engine,
    autosave: &mut Autosave,
    in_flight: &mut Option<ChangeSet>,
    message: ServerMessage,
    now: Instant,
) -> Result<(), ClientError> {
    match message {
        ServerMessage::ChangeSetApplied {} => {
            if let Some(submitted) = in_flight.take() {
                autosave.on_applied(now, &submitted, engine.state.pending_mut());
                tracing::debug!(cleared = submitted.len(), "save acknowledged");
            }
            Ok(())
        }
        ServerMessage::ChangeSetBroadcast { change_set } => {
            tracing::info!(entries = change_set.len(), "peer change-set received");
            engine.apply_remote(&change_set);
            Ok(())
        }
        ServerMessage::Error { code, message, retryable } => {
            if retryable {
                tracing::warn!(code, message, "save failed; will retry");
                *in_flight = None;
                autosave.on_failure(now);
                Ok(())
            } else {
                Err(ClientError::Server { code, message })
            }
        }
    }
}

/// A live connection to one note's room.
pub struct NoteSession {
    stream: WsStream,
    pub engine: Engine,
    pub autosave: Autosave,
    note_id: Uuid,
    in_flight: Option<ChangeSet>,
}

impl NoteSession {
    /// Fetch the snapshot, open the socket, and join the note's room.
    pub async fn connect(
        base_url: &str,
        token: &str,
        note_id: Uuid,
    ) -> Result<Self, ClientError> {
        let snapshot = fetch_note(base_url, token, note_id).await?;
        let mut engine = Engine::new();
        engine.load_snapshot(snapshot);

        let (mut stream, _) = connect_async(ws_url(base_url, token)?).await?;
        let join = serde_json::to_string(&ClientMessage::JoinNote { note_id })?;
        stream.send(Message::Text(join.into())).await?;
        tracing::info!(%note_id, "joined note");

        Ok(Self {
            stream,
            engine,
            autosave: Autosave::default(),
            note_id,
            in_flight: None,
        })
    }

    /// Record that a local edit happened, arming the debounce window.
    pub fn mark_dirty(&mut self) {
        self.autosave.note_local_change(Instant::now());
    }

    /// Run the session until the socket closes or a fatal error arrives.
    pub async fn run(&mut self) -> Result<(), ClientError> {
        let mut tick = tokio::time::interval(Duration::from_millis(250));
        loop {
            tokio::select! {
                message = self.stream.next() => {
                    self.handle_socket(message)?;
                }
                _ = tick.tick() => {
                    self.flush(Instant::now()).await?;
                }
            }
        }
    }

    /// Run until everything pending has been acknowledged.
    pub async fn run_until_saved(&mut self, timeout: Duration) -> Result<(), ClientError> {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut tick = tokio::time::interval(Duration::from_millis(100));
        while !(self.autosave.is_saved() && self.in_flight.is_none()) {
            if tokio::time::Instant::now() >= deadline {
                return Err(ClientError::Timeout);
            }
            tokio::select! {
                message = self.stream.next() => {
                    self.handle_socket(message)?;
                }
                _ = tick.tick() => {
                    self.flush(Instant::now()).await?;
                }
            }
        }
        Ok(())
    }

    fn handle_socket(
        &mut self,
        message: Option<Result<Message, tungstenite::Error>>,
    ) -> Result<(), ClientError> {
        let Some(message) = message else {
            return Err(ClientError::WsClosed);
        };
        match message? {
            Message::Text(text) => {
                let parsed: ServerMessage = serde_json::from_str(text.as_str())?;
                apply_server_message(
                    &mut self.engine,
                    &mut self.autosave,
                    &mut self.in_flight,
                    parsed,
                    Instant::now(),
                )
            }
            Message::Close(frame) => Err(close_error(frame)),
            _ => Ok(()),
        }
    }

    /// Submit the pending change-set if the debounce window has elapsed.
    async fn flush(&mut self, now: Instant) -> Result<(), ClientError> {
        let Some(submitted) = self.autosave.poll(now, self.engine.state.pending()) else {
            return Ok(());
        };
        let png = render_thumbnail(
            self.engine.state.strokes(),
            self.engine.state.boxes(),
            THUMBNAIL_PX,
        )?;
        let save = ClientMessage::SaveChangeSet {
            note_id: self.note_id,
            change_set: submitted.clone(),
            thumbnail: Some(thumbnail_data_url(&png)),
        };
        self.stream
            .send(Message::Text(serde_json::to_string(&save)?.into()))
            .await?;
        tracing::info!(entries = submitted.len(), "change-set submitted");
        self.in_flight = Some(submitted);
        Ok(())
    }
}
