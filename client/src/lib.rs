//! Sync client for the collaborative note canvas.
//!
//! Wraps the pure `canvas` engine with everything it deliberately does
//! not own: the debounced autosave state machine, the thumbnail
//! rasterizer, and the websocket session loop that exchanges change-sets
//! with the room broker.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`sync`] | Clock-injected autosave debounce state machine |
//! | [`thumbnail`] | Note thumbnail rasterizer (PNG) |
//! | [`session`] | REST loader and websocket session loop |

pub mod session;
pub mod sync;
pub mod thumbnail;
