//! Note service — CRUD, ownership checks, and the targeted merge.
//!
//! DESIGN
//! ======
//! Documents live in Postgres as one `notes` row plus per-entity `strokes`
//! and `text_boxes` rows, so a save never rewrites the whole document.
//! `apply_change_set` runs one transaction that upserts the saved entities
//! by id, deletes the deleted ids, and refreshes the thumbnail. Concurrent
//! saves to the same note serialize on that transaction; the outcome across
//! clients is last-applied-wins per entity.

#[cfg(test)]
#[path = "note_test.rs"]
mod tests;

use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;
use wire::{BoxHeight, ChangeSet, ErrorCode, NoteSnapshot, Sample, Stroke, TextBox};

#[derive(Debug, thiserror::Error)]
pub enum NoteError {
    #[error("note not found: {0}")]
    NotFound(Uuid),
    #[error("note {0} belongs to another user")]
    NotOwned(Uuid),
    #[error("change-set references a note other than the joined one")]
    InvalidReference,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ErrorCode for NoteError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_NOTE_NOT_FOUND",
            Self::NotOwned(_) => "E_NOT_OWNED",
            Self::InvalidReference => "E_INVALID_REFERENCE",
            Self::Database(_) => "E_DATABASE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

/// Note metadata row, without stroke/box payloads.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteMeta {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

/// Create a note for the given owner.
///
/// # Errors
///
/// Returns a database error if the insert fails.
pub async fn create_note(
    pool: &PgPool,
    owner_id: Uuid,
    name: &str,
) -> Result<NoteMeta, NoteError> {
    let row = sqlx::query("INSERT INTO notes (owner_id, name) VALUES ($1, $2) RETURNING id")
        .bind(owner_id)
        .bind(name)
        .fetch_one(pool)
        .await?;
    Ok(NoteMeta {
        id: row.get("id"),
        name: name.to_string(),
        background: None,
        thumbnail: None,
    })
}

/// List the owner's notes, newest first. Thumbnails ride along for the
/// gallery; stroke and box payloads do not.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_notes(pool: &PgPool, owner_id: Uuid) -> Result<Vec<NoteMeta>, NoteError> {
    let rows = sqlx::query(
        "SELECT id, name, background, thumbnail
         FROM notes
         WHERE owner_id = $1
         ORDER BY updated_at DESC",
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| NoteMeta {
            id: r.get("id"),
            name: r.get("name"),
            background: r.get("background"),
            thumbnail: r.get("thumbnail"),
        })
        .collect())
}

/// Load the full document: metadata plus every stroke and text box.
///
/// # Errors
///
/// Returns `NotFound` for an unknown id, or a database error.
pub async fn load_snapshot(pool: &PgPool, note_id: Uuid) -> Result<NoteSnapshot, NoteError> {
    let note = sqlx::query("SELECT id, name, background, thumbnail FROM notes WHERE id = $1")
        .bind(note_id)
        .fetch_optional(pool)
        .await?
        .ok_or(NoteError::NotFound(note_id))?;

    let strokes = sqlx::query("SELECT id, colour, size, points FROM strokes WHERE note_id = $1")
        .bind(note_id)
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(|r| Stroke {
            id: r.get("id"),
            colour: r.get("colour"),
            points: r.get::<Json<Vec<Sample>>, _>("points").0,
            size: r.get("size"),
        })
        .collect();

    let text_boxes =
        sqlx::query("SELECT id, x, y, width, height, content FROM text_boxes WHERE note_id = $1")
            .bind(note_id)
            .fetch_all(pool)
            .await?
            .into_iter()
            .map(|r| TextBox {
                id: r.get("id"),
                x: r.get("x"),
                y: r.get("y"),
                width: r.get("width"),
                height: r.get::<Json<BoxHeight>, _>("height").0,
                content: r.get::<Json<serde_json::Value>, _>("content").0,
            })
            .collect();

    Ok(NoteSnapshot {
        id: note.get("id"),
        name: note.get("name"),
        background: note.get("background"),
        thumbnail: note.get("thumbnail"),
        strokes,
        text_boxes,
    })
}

/// Rename a note.
///
/// # Errors
///
/// Returns `NotFound` for an unknown id, or a database error.
pub async fn rename_note(pool: &PgPool, note_id: Uuid, name: &str) -> Result<(), NoteError> {
    let result = sqlx::query("UPDATE notes SET name = $2, updated_at = now() WHERE id = $1")
        .bind(note_id)
        .bind(name)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(NoteError::NotFound(note_id));
    }
    Ok(())
}

/// Delete a note and, via cascade, its strokes and boxes.
///
/// # Errors
///
/// Returns `NotFound` for an unknown id, or a database error.
pub async fn delete_note(pool: &PgPool, note_id: Uuid) -> Result<(), NoteError> {
    let result = sqlx::query("DELETE FROM notes WHERE id = $1")
        .bind(note_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(NoteError::NotFound(note_id));
    }
    Ok(())
}

/// Verify that the note exists and belongs to the given user.
///
/// # Errors
///
/// `NotFound` for an unknown id, `NotOwned` for someone else's note.
pub async fn assert_owner(pool: &PgPool, note_id: Uuid, user_id: Uuid) -> Result<(), NoteError> {
    let row = sqlx::query("SELECT owner_id FROM notes WHERE id = $1")
        .bind(note_id)
        .fetch_optional(pool)
        .await?
        .ok_or(NoteError::NotFound(note_id))?;
    let owner_id: Uuid = row.get("owner_id");
    if owner_id != user_id {
        return Err(NoteError::NotOwned(note_id));
    }
    Ok(())
}

/// Apply a change-set as one transaction: upsert the saved entities by id,
/// delete the deleted ids, refresh the thumbnail. The upserts refuse to
/// touch rows belonging to a different note, so a forged id cannot cross
/// document boundaries.
///
/// # Errors
///
/// Returns a database error if any statement or the commit fails.
pub async fn apply_change_set(
    pool: &PgPool,
    note_id: Uuid,
    change_set: &ChangeSet,
    thumbnail: Option<&str>,
) -> Result<(), NoteError> {
    let mut tx = pool.begin().await?;

    for stroke in change_set.strokes_to_save.values() {
        sqlx::query(
            "INSERT INTO strokes (id, note_id, colour, size, points)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (id) DO UPDATE
             SET colour = EXCLUDED.colour, size = EXCLUDED.size, points = EXCLUDED.points
             WHERE strokes.note_id = EXCLUDED.note_id",
        )
        .bind(stroke.id)
        .bind(note_id)
        .bind(&stroke.colour)
        .bind(stroke.size)
        .bind(Json(&stroke.points))
        .execute(&mut *tx)
        .await?;
    }

    if !change_set.strokes_to_delete.is_empty() {
        let ids: Vec<Uuid> = change_set.strokes_to_delete.iter().copied().collect();
        sqlx::query("DELETE FROM strokes WHERE note_id = $1 AND id = ANY($2)")
            .bind(note_id)
            .bind(&ids)
            .execute(&mut *tx)
            .await?;
    }

    for text_box in change_set.boxes_to_save.values() {
        sqlx::query(
            "INSERT INTO text_boxes (id, note_id, x, y, width, height, content)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (id) DO UPDATE
             SET x = EXCLUDED.x, y = EXCLUDED.y, width = EXCLUDED.width,
                 height = EXCLUDED.height, content = EXCLUDED.content
             WHERE text_boxes.note_id = EXCLUDED.note_id",
        )
        .bind(text_box.id)
        .bind(note_id)
        .bind(text_box.x)
        .bind(text_box.y)
        .bind(text_box.width)
        .bind(Json(&text_box.height))
        .bind(Json(&text_box.content))
        .execute(&mut *tx)
        .await?;
    }

    if !change_set.boxes_to_delete.is_empty() {
        let ids: Vec<Uuid> = change_set.boxes_to_delete.iter().copied().collect();
        sqlx::query("DELETE FROM text_boxes WHERE note_id = $1 AND id = ANY($2)")
            .bind(note_id)
            .bind(&ids)
            .execute(&mut *tx)
            .await?;
    }

    match thumbnail {
        Some(thumbnail) => {
            sqlx::query("UPDATE notes SET thumbnail = $2, updated_at = now() WHERE id = $1")
                .bind(note_id)
                .bind(thumbnail)
                .execute(&mut *tx)
                .await?;
        }
        None => {
            sqlx::query("UPDATE notes SET updated_at = now() WHERE id = $1")
                .bind(note_id)
                .execute(&mut *tx)
                .await?;
        }
    }

    tx.commit().await?;
    Ok(())
}
