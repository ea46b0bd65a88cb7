//! Note REST routes with bearer-token auth.
//!
//! DESIGN
//! ======
//! Every handler takes an [`AuthUser`] extractor that resolves the
//! `Authorization: Bearer` header to a session user; ownership is then
//! checked per note. Listing returns metadata and thumbnails only; the
//! full document travels once, in `GET /api/notes/{id}`, when a canvas
//! opens.

#[cfg(test)]
#[path = "notes_test.rs"]
mod tests;

use axum::extract::{FromRequestParts, Path, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;
use wire::NoteSnapshot;

use crate::services::note::{self, NoteError, NoteMeta};
use crate::services::session::SessionUser;
use crate::state::AppState;

/// Authenticated user, resolved from the `Authorization: Bearer` header.
pub struct AuthUser {
    pub user: SessionUser,
}

/// Extract the bearer token from request headers.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(&parts.headers) else {
            return Err(StatusCode::UNAUTHORIZED);
        };
        match crate::services::session::validate_session(&state.pool, token).await {
            Ok(Some(user)) => Ok(Self { user }),
            Ok(None) => Err(StatusCode::UNAUTHORIZED),
            Err(e) => {
                tracing::error!(error = %e, "session validation failed");
                Err(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

fn note_error_to_status(err: &NoteError) -> StatusCode {
    match err {
        NoteError::NotFound(_) => StatusCode::NOT_FOUND,
        NoteError::NotOwned(_) => StatusCode::FORBIDDEN,
        NoteError::InvalidReference => StatusCode::BAD_REQUEST,
        NoteError::Database(_) => {
            tracing::error!(error = %err, "note query failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[derive(Deserialize)]
pub struct CreateNoteBody {
    pub name: Option<String>,
}

#[derive(Deserialize)]
pub struct RenameNoteBody {
    pub name: String,
}

/// `GET /api/notes` — list the caller's notes, metadata only.
pub async fn list_notes(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<NoteMeta>>, StatusCode> {
    let notes = note::list_notes(&state.pool, auth.user.id)
        .await
        .map_err(|e| note_error_to_status(&e))?;
    Ok(Json(notes))
}

/// `POST /api/notes` — create a note.
pub async fn create_note(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateNoteBody>,
) -> Result<Json<NoteMeta>, StatusCode> {
    let name = body.name.as_deref().unwrap_or("Untitled");
    let meta = note::create_note(&state.pool, auth.user.id, name)
        .await
        .map_err(|e| note_error_to_status(&e))?;
    Ok(Json(meta))
}

/// `GET /api/notes/{id}` — the full document snapshot.
pub async fn get_note(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(note_id): Path<Uuid>,
) -> Result<Json<NoteSnapshot>, StatusCode> {
    note::assert_owner(&state.pool, note_id, auth.user.id)
        .await
        .map_err(|e| note_error_to_status(&e))?;
    let snapshot = note::load_snapshot(&state.pool, note_id)
        .await
        .map_err(|e| note_error_to_status(&e))?;
    Ok(Json(snapshot))
}

/// `PATCH /api/notes/{id}` — rename.
pub async fn rename_note(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(note_id): Path<Uuid>,
    Json(body): Json<RenameNoteBody>,
) -> Result<StatusCode, StatusCode> {
    note::assert_owner(&state.pool, note_id, auth.user.id)
        .await
        .map_err(|e| note_error_to_status(&e))?;
    note::rename_note(&state.pool, note_id, &body.name)
        .await
        .map_err(|e| note_error_to_status(&e))?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /api/notes/{id}` — delete the note and its contents.
pub async fn delete_note(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(note_id): Path<Uuid>,
) -> Result<StatusCode, StatusCode> {
    note::assert_owner(&state.pool, note_id, auth.user.id)
        .await
        .map_err(|e| note_error_to_status(&e))?;
    note::delete_note(&state.pool, note_id)
        .await
        .map_err(|e| note_error_to_status(&e))?;
    Ok(StatusCode::NO_CONTENT)
}
