//! Canvas entities: pointer samples, strokes, text boxes, and snapshots.
//!
//! DESIGN
//! ======
//! Entity ids are v4 UUIDs assigned client-side at creation, so optimistic
//! local application never waits for a server round trip. A `Stroke` is
//! immutable after pointer-up except for bulk translation during a drag.
//! A `TextBox` owns its geometry here; its `content` is an opaque blob
//! owned by the external rich-text editor.

#[cfg(test)]
#[path = "entity_test.rs"]
mod entity_test;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// One raw pointer reading in document (world) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub x: f64,
    pub y: f64,
    /// Stylus pressure in `[0, 1]`; mice report a constant 0.5.
    pub pressure: f64,
}

impl Sample {
    #[must_use]
    pub fn new(x: f64, y: f64, pressure: f64) -> Self {
        Self { x, y, pressure }
    }
}

/// A freehand stroke: an ordered sample sequence plus pen settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub id: Uuid,
    /// Pen colour as a CSS color string.
    pub colour: String,
    pub points: Vec<Sample>,
    /// Pen diameter in world units.
    pub size: f64,
}

impl Stroke {
    #[must_use]
    pub fn new(colour: impl Into<String>, points: Vec<Sample>, size: f64) -> Self {
        Self { id: Uuid::new_v4(), colour: colour.into(), points, size }
    }

    /// Translate every sample by `(dx, dy)`. The only mutation a stroke
    /// accepts after creation.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        for point in &mut self.points {
            point.x += dx;
            point.y += dy;
        }
    }
}

/// Text box height: fixed in world units, or grown by the editor.
///
/// Serialized as a JSON number or the string `"auto"`, matching the
/// stored document format.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoxHeight {
    Fixed(f64),
    Auto,
}

impl BoxHeight {
    /// The fixed height, or `fallback` when the editor controls it.
    #[must_use]
    pub fn fixed_or(self, fallback: f64) -> f64 {
        match self {
            Self::Fixed(h) => h,
            Self::Auto => fallback,
        }
    }
}

impl Serialize for BoxHeight {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Fixed(h) => serializer.serialize_f64(*h),
            Self::Auto => serializer.serialize_str("auto"),
        }
    }
}

impl<'de> Deserialize<'de> for BoxHeight {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Fixed(f64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Fixed(h) => Ok(Self::Fixed(h)),
            Repr::Text(s) if s == "auto" => Ok(Self::Auto),
            Repr::Text(s) => Err(D::Error::custom(format!("invalid box height: {s:?}"))),
        }
    }
}

/// A text box: geometry owned by the canvas, content owned by the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBox {
    pub id: Uuid,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: BoxHeight,
    /// Opaque rich-text document blob.
    pub content: serde_json::Value,
}

/// Default width in world units for a freshly placed text box.
pub const DEFAULT_BOX_WIDTH: f64 = 100.0;

impl TextBox {
    /// A new empty box at `(x, y)` with default geometry.
    #[must_use]
    pub fn new_at(x: f64, y: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            x,
            y,
            width: DEFAULT_BOX_WIDTH,
            height: BoxHeight::Auto,
            content: empty_content(),
        }
    }
}

/// The empty rich-text document, as produced by the external editor.
#[must_use]
pub fn empty_content() -> serde_json::Value {
    serde_json::json!({ "type": "doc", "content": [] })
}

/// The persisted document as loaded over REST.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteSnapshot {
    pub id: Uuid,
    pub name: String,
    /// Background pattern identifier, if the note has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    /// Base64 PNG rendered by the last client to save.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    pub strokes: Vec<Stroke>,
    pub text_boxes: Vec<TextBox>,
}
