//! Pure canvas engine for the collaborative note canvas.
//!
//! This crate owns everything between raw pointer events and the pending
//! change-set: camera state for pan/zoom on the fixed 5000x5000 document,
//! the in-memory entity store with its dirty tracker, the gesture state
//! machine, hit-testing, and the stroke outline renderer with its cache.
//! It performs no I/O; the `client` crate wires it to a websocket session
//! and decides when the pending change-set is flushed.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Top-level engine: pointer dispatch and effects |
//! | [`store`] | Entity store plus the pending change-set |
//! | [`camera`] | Pan/zoom viewport and coordinate conversions |
//! | [`input`] | Tools, modifiers, and the gesture state machine |
//! | [`hit`] | Hit-testing, erase radius, and resize anchor math |
//! | [`outline`] | Variable-width stroke outlines and their cache |
//! | [`consts`] | Shared numeric constants (zoom limits, eraser radius, etc.) |

pub mod camera;
pub mod consts;
pub mod engine;
pub mod hit;
pub mod input;
pub mod outline;
pub mod store;
