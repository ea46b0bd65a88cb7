//! Input model: tools, modifier keys, the selection, and the gesture
//! state machine.
//!
//! `Gesture` is the active interaction being tracked between pointer-down
//! and pointer-up, carrying all context needed to compute incremental
//! deltas and emit final store mutations on release. A gesture is never
//! silently abandoned: every tracked pointer resolves through pointer-up
//! or pointer-cancel, and cancel resets to `Idle` discarding in-progress
//! samples.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use std::collections::{HashMap, HashSet};

use uuid::Uuid;
use wire::Sample;

use crate::camera::Point;
use crate::hit::{BoxGeometry, ResizeAnchor};

/// Which tool is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    /// Pointer / selection tool (default).
    #[default]
    Mouse,
    /// Drag the viewport.
    Pan,
    /// Freehand drawing.
    Pen,
    /// Remove strokes under the pointer.
    Eraser,
    /// Place a text box.
    Text,
}

/// Keyboard modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    /// Ctrl on most platforms, Cmd on macOS.
    #[must_use]
    pub fn primary(self) -> bool {
        self.ctrl || self.meta
    }
}

/// The current rubber-band selection.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub strokes: HashSet<Uuid>,
    pub boxes: HashSet<Uuid>,
}

impl Selection {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty() && self.boxes.is_empty()
    }

    pub fn clear(&mut self) {
        self.strokes.clear();
        self.boxes.clear();
    }
}

/// The active gesture being tracked between pointer-down and pointer-up.
#[derive(Debug, Clone, Default)]
pub enum Gesture {
    /// No gesture in progress; waiting for the next pointer-down.
    #[default]
    Idle,
    /// One pointer dragging the viewport.
    Panning {
        /// Screen-space offset from the pointer to the pan origin,
        /// captured at gesture start; `pan = pointer - grab`.
        grab: Point,
    },
    /// Two pointers zooming. The world point under the captured screen
    /// midpoint stays fixed for the whole gesture.
    Pinching {
        /// Screen midpoint of the two pointers at gesture start.
        screen_mid: Point,
        /// World image of `screen_mid` at gesture start.
        world_mid: Point,
        /// Pointer separation at gesture start, in screen pixels.
        start_distance: f64,
        /// Viewport scale at gesture start.
        start_scale: f64,
    },
    /// Pen down, accumulating world-space samples.
    Drawing { samples: Vec<Sample> },
    /// Eraser down; strokes are removed as the pointer passes them.
    Erasing,
    /// Rubber-band selection rectangle between two world points.
    Selecting { start: Point, end: Point },
    /// Translating the current selection from captured initial positions.
    DraggingSelection {
        /// World-space pointer position at drag start.
        start: Point,
        /// Sample sequences of the selected strokes at drag start.
        stroke_origins: HashMap<Uuid, Vec<Sample>>,
        /// Origins of the selected boxes at drag start.
        box_origins: HashMap<Uuid, (f64, f64)>,
    },
    /// Reshaping a text box by one of its eight compass handles.
    ResizingBox {
        id: Uuid,
        anchor: ResizeAnchor,
        /// World-space pointer position at resize start.
        start: Point,
        /// Box geometry at resize start, height resolved to a number.
        orig: BoxGeometry,
    },
}
