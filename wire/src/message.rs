//! Websocket messages and structured error codes.
//!
//! DESIGN
//! ======
//! Messages are externally tagged JSON (`"type"` field, camelCase) so a
//! client written in any language can dispatch on one string. The server
//! never rewrites a change-set it relays: the broadcast carries the
//! submitting client's payload unmodified.

#[cfg(test)]
#[path = "message_test.rs"]
mod message_test;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::change::ChangeSet;

/// Websocket close code sent when the upgrade credential is missing or
/// invalid. Distinct from normal closure so clients can prompt re-auth
/// instead of reconnecting.
pub const AUTH_CLOSE_CODE: u16 = 4401;

/// Grepable error code and retryable flag for structured error payloads.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    /// Whether the client should keep the change-set staged and retry on
    /// the next debounce cycle.
    fn retryable(&self) -> bool {
        false
    }
}

/// Client → server messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Declare which note this connection is viewing. The connection is
    /// moved between rooms if it was already viewing another note.
    #[serde(rename_all = "camelCase")]
    JoinNote { note_id: Uuid },
    /// Submit a batch of pending saves/deletes for targeted merge.
    #[serde(rename_all = "camelCase")]
    SaveChangeSet {
        note_id: Uuid,
        change_set: ChangeSet,
        /// Base64 PNG thumbnail rendered by the submitting client.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        thumbnail: Option<String>,
    },
}

/// Server → client messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// The submitted change-set was persisted. Sent only to the submitter.
    ChangeSetApplied {},
    /// A peer's change-set, relayed unmodified to everyone else in the room.
    #[serde(rename_all = "camelCase")]
    ChangeSetBroadcast { change_set: ChangeSet },
    /// A request failed. `retryable` follows the error taxonomy: transient
    /// persistence failures are retried by the client's next debounce
    /// cycle, ownership and reference errors are not.
    Error {
        code: String,
        message: String,
        retryable: bool,
    },
}

impl ServerMessage {
    /// Build an error message from a typed error.
    #[must_use]
    pub fn error_from(err: &(impl ErrorCode + ?Sized)) -> Self {
        Self::Error {
            code: err.error_code().to_string(),
            message: err.to_string(),
            retryable: err.retryable(),
        }
    }
}
