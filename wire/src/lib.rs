//! Shared data model and websocket protocol for the note canvas.
//!
//! ARCHITECTURE
//! ============
//! Every entity that crosses a process boundary lives here: the drawing
//! primitives (`Sample`, `Stroke`, `TextBox`), the persisted document
//! (`NoteSnapshot`), the batched mutation payload (`ChangeSet`), and the
//! tagged websocket messages exchanged between a client and the room
//! broker. The canvas engine, the sync client, and the server all agree
//! on these types, so a change-set staged locally is byte-identical to
//! the one a peer receives in a broadcast.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`entity`] | Strokes, text boxes, and document snapshots |
//! | [`change`] | The `ChangeSet` dirty-tracker payload |
//! | [`message`] | Websocket message enums and error codes |

pub mod change;
pub mod entity;
pub mod message;

pub use change::ChangeSet;
pub use entity::{BoxHeight, NoteSnapshot, Sample, Stroke, TextBox};
pub use message::{AUTH_CLOSE_CODE, ClientMessage, ErrorCode, ServerMessage};
