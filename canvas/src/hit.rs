//! Hit-testing and resize anchor math.
//!
//! Pure functions over the entity maps: the store and engine call these
//! to decide what an eraser pass removes, what a rubber-band rectangle
//! selects, and how a drag on one of the eight compass handles reshapes
//! a text box.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use std::collections::HashMap;

use uuid::Uuid;
use wire::{Stroke, TextBox};

use crate::camera::Point;
use crate::consts::MIN_BOX_SIZE;

/// An axis-aligned world-space rectangle, normalized on construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldRect {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl WorldRect {
    /// Build from any two opposite corners.
    #[must_use]
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            min_x: a.x.min(b.x),
            min_y: a.y.min(b.y),
            max_x: a.x.max(b.x),
            max_y: a.y.max(b.y),
        }
    }

    #[must_use]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

/// Ids of strokes with any sample within `radius` of `world`.
#[must_use]
pub fn erase_hits(strokes: &HashMap<Uuid, Stroke>, world: Point, radius: f64) -> Vec<Uuid> {
    strokes
        .iter()
        .filter(|(_, stroke)| {
            stroke
                .points
                .iter()
                .any(|p| Point::new(p.x, p.y).distance(world) <= radius)
        })
        .map(|(id, _)| *id)
        .collect()
}

/// Ids of strokes with any sample inside `rect`.
#[must_use]
pub fn strokes_in_rect(strokes: &HashMap<Uuid, Stroke>, rect: WorldRect) -> Vec<Uuid> {
    strokes
        .iter()
        .filter(|(_, stroke)| stroke.points.iter().any(|p| rect.contains(p.x, p.y)))
        .map(|(id, _)| *id)
        .collect()
}

/// Ids of text boxes whose origin falls inside `rect`.
#[must_use]
pub fn boxes_in_rect(boxes: &HashMap<Uuid, TextBox>, rect: WorldRect) -> Vec<Uuid> {
    boxes
        .iter()
        .filter(|(_, b)| rect.contains(b.x, b.y))
        .map(|(id, _)| *id)
        .collect()
}

/// Anchor position for the eight resize handles around a text box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeAnchor {
    N,
    Ne,
    E,
    Se,
    S,
    Sw,
    W,
    Nw,
}

impl ResizeAnchor {
    #[must_use]
    pub fn west(self) -> bool {
        matches!(self, Self::W | Self::Nw | Self::Sw)
    }

    #[must_use]
    pub fn east(self) -> bool {
        matches!(self, Self::E | Self::Ne | Self::Se)
    }

    #[must_use]
    pub fn north(self) -> bool {
        matches!(self, Self::N | Self::Nw | Self::Ne)
    }

    #[must_use]
    pub fn south(self) -> bool {
        matches!(self, Self::S | Self::Sw | Self::Se)
    }

    /// Whether dragging this handle changes the box height.
    #[must_use]
    pub fn vertical(self) -> bool {
        self.north() || self.south()
    }
}

/// Resolved box geometry during a resize, height always a number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxGeometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Apply a drag of `(dx, dy)` on `anchor` to `orig`.
///
/// East/south handles grow the far edge; west/north handles move the
/// origin while shrinking the extent by the same amount, so the opposite
/// edge stays put. Both extents clamp at `MIN_BOX_SIZE`, re-anchoring the
/// origin for west/north drags so the fixed edge never moves.
#[must_use]
pub fn resize_box(orig: BoxGeometry, anchor: ResizeAnchor, dx: f64, dy: f64) -> BoxGeometry {
    let mut geom = orig;

    if anchor.east() {
        geom.width = orig.width + dx;
    } else if anchor.west() {
        geom.x = orig.x + dx;
        geom.width = orig.width - dx;
    }
    if anchor.south() {
        geom.height = orig.height + dy;
    } else if anchor.north() {
        geom.y = orig.y + dy;
        geom.height = orig.height - dy;
    }

    if geom.width < MIN_BOX_SIZE {
        if anchor.west() {
            geom.x = orig.x + orig.width - MIN_BOX_SIZE;
        }
        geom.width = MIN_BOX_SIZE;
    }
    if geom.height < MIN_BOX_SIZE {
        if anchor.north() {
            geom.y = orig.y + orig.height - MIN_BOX_SIZE;
        }
        geom.height = MIN_BOX_SIZE;
    }

    geom
}
