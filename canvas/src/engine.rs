//! Top-level engine: raw pointer events in, store mutations and effects out.
//!
//! ARCHITECTURE
//! ============
//! The engine owns the store, the viewport, the gesture state machine,
//! and the outline cache. Hosts feed it pointer/key events plus the
//! occasional direct command (box content, context-menu delete, resize
//! handle grabs, which are host chrome) and react to the returned
//! [`Effect`]: repaint on `ViewChanged`; repaint and arm the autosave
//! debounce whenever [`Effect::arms_autosave`] holds (`DocChanged`, and
//! `EditText`, which additionally opens the rich-text editor for the
//! box it names).
//! Remote merges go through [`Engine::apply_remote`], which stages
//! nothing, so the host never arms the debounce for a peer's edit.
//!
//! Pointers are tracked by id from down to up/cancel; a gesture is never
//! silently abandoned. A second pointer always converts the gesture to a
//! pinch (discarding buffered pen samples), and losing one pinch pointer
//! degrades to a pan under the remaining finger.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use std::collections::{BTreeMap, HashMap};

use uuid::Uuid;
use wire::{ChangeSet, NoteSnapshot, Sample, Stroke};

use crate::camera::{Point, Viewport, clamp_scale};
use crate::consts::{ERASER_RADIUS, PINCH_DAMPING};
use crate::hit::{self, BoxGeometry, ResizeAnchor, WorldRect};
use crate::input::{Gesture, Modifiers, Selection, Tool};
use crate::outline::OutlineCache;
use crate::store::CanvasState;

/// What the host should do after an engine call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Nothing to do.
    None,
    /// Repaint; the camera or chrome changed but the document did not.
    ViewChanged,
    /// Repaint and treat this as a local edit (arm the autosave debounce).
    DocChanged,
    /// A text box was just created and staged; open the editor for it.
    /// Save-arming, like `DocChanged`: the box persists even if the host
    /// never touches the editor.
    EditText(Uuid),
}

impl Effect {
    /// Whether the host should treat this as a local edit and (re)start
    /// the autosave debounce window.
    #[must_use]
    pub fn arms_autosave(&self) -> bool {
        matches!(self, Self::DocChanged | Self::EditText(_))
    }
}

/// Default pen colour for new strokes.
const DEFAULT_PEN_COLOUR: &str = "#1f1a17";

/// Default pen diameter in world units.
const DEFAULT_PEN_SIZE: f64 = 4.0;

/// The full canvas engine.
pub struct Engine {
    pub state: CanvasState,
    pub viewport: Viewport,
    pub tool: Tool,
    pub gesture: Gesture,
    pub selection: Selection,
    pub pen_colour: String,
    pub pen_size: f64,
    pub viewport_width: f64,
    pub viewport_height: f64,
    pub cache: OutlineCache,
    /// Live pointers by id, captured on down, released on up/cancel.
    pointers: BTreeMap<i64, Point>,
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            state: CanvasState::new(),
            viewport: Viewport::default(),
            tool: Tool::default(),
            gesture: Gesture::default(),
            selection: Selection::default(),
            pen_colour: DEFAULT_PEN_COLOUR.to_string(),
            pen_size: DEFAULT_PEN_SIZE,
            viewport_width: 0.0,
            viewport_height: 0.0,
            cache: OutlineCache::new(),
            pointers: BTreeMap::new(),
        }
    }
}

impl Engine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hydrate from a server snapshot. Stages nothing.
    pub fn load_snapshot(&mut self, snapshot: NoteSnapshot) -> Effect {
        self.state.load_snapshot(snapshot);
        self.selection.clear();
        self.cache.prune(&self.state.stroke_ids());
        Effect::ViewChanged
    }

    /// Update viewport dimensions, re-clamping the pan.
    pub fn set_viewport(&mut self, width: f64, height: f64) -> Effect {
        self.viewport_width = width;
        self.viewport_height = height;
        self.viewport.clamp_pan(width, height);
        Effect::ViewChanged
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
    }

    // --- Pointer events ---

    pub fn pointer_down(&mut self, pointer_id: i64, screen: Point, pressure: f64) -> Effect {
        self.pointers.insert(pointer_id, screen);

        if self.pointers.len() == 2 {
            return self.begin_pinch();
        }
        if self.pointers.len() > 2 {
            return Effect::None;
        }

        let world = self.viewport.screen_to_world(screen);
        match self.tool {
            Tool::Pan => {
                self.gesture = Gesture::Panning {
                    grab: Point::new(screen.x - self.viewport.pan_x, screen.y - self.viewport.pan_y),
                };
                Effect::None
            }
            Tool::Pen => {
                self.gesture = Gesture::Drawing {
                    samples: vec![Sample::new(world.x, world.y, pressure)],
                };
                Effect::ViewChanged
            }
            Tool::Eraser => {
                self.gesture = Gesture::Erasing;
                self.erase(world)
            }
            Tool::Mouse => {
                if self.selection.is_empty() {
                    self.gesture = Gesture::Selecting { start: world, end: world };
                    Effect::ViewChanged
                } else {
                    self.begin_selection_drag(world)
                }
            }
            Tool::Text => {
                let id = self.state.create_box_at(world.x, world.y);
                self.selection.clear();
                self.tool = Tool::Mouse;
                Effect::EditText(id)
            }
        }
    }

    pub fn pointer_move(&mut self, pointer_id: i64, screen: Point, pressure: f64) -> Effect {
        if !self.pointers.contains_key(&pointer_id) {
            return Effect::None;
        }
        self.pointers.insert(pointer_id, screen);

        let world = self.viewport.screen_to_world(screen);
        match &mut self.gesture {
            Gesture::Idle => Effect::None,
            Gesture::Panning { grab } => {
                self.viewport.pan_x = screen.x - grab.x;
                self.viewport.pan_y = screen.y - grab.y;
                self.viewport.clamp_pan(self.viewport_width, self.viewport_height);
                Effect::ViewChanged
            }
            Gesture::Pinching { screen_mid, world_mid, start_distance, start_scale } => {
                let mut live = self.pointers.values();
                let (Some(&a), Some(&b)) = (live.next(), live.next()) else {
                    return Effect::None;
                };
                let factor = a.distance(b) / *start_distance;
                let damped = 1.0 + (factor - 1.0) * PINCH_DAMPING;
                let scale = clamp_scale(*start_scale * damped);
                self.viewport.scale = scale;
                self.viewport.pan_x = screen_mid.x - world_mid.x * scale;
                self.viewport.pan_y = screen_mid.y - world_mid.y * scale;
                self.viewport.clamp_pan(self.viewport_width, self.viewport_height);
                Effect::ViewChanged
            }
            Gesture::Drawing { samples } => {
                samples.push(Sample::new(world.x, world.y, pressure));
                Effect::ViewChanged
            }
            Gesture::Erasing => self.erase(world),
            Gesture::Selecting { end, .. } => {
                *end = world;
                Effect::ViewChanged
            }
            Gesture::DraggingSelection { start, stroke_origins, box_origins } => {
                let (dx, dy) = (world.x - start.x, world.y - start.y);
                for (id, origin) in stroke_origins.iter() {
                    self.state.translate_stroke_from(*id, origin, dx, dy);
                    self.cache.invalidate(id);
                }
                for (id, (ox, oy)) in box_origins.iter() {
                    self.state.move_box_to(*id, ox + dx, oy + dy);
                }
                Effect::DocChanged
            }
            Gesture::ResizingBox { id, anchor, start, orig } => {
                let geom = hit::resize_box(*orig, *anchor, world.x - start.x, world.y - start.y);
                let (id, fix_height) = (*id, anchor.vertical());
                self.state.resize_box_to(id, geom, fix_height);
                Effect::DocChanged
            }
        }
    }

    pub fn pointer_up(&mut self, pointer_id: i64, screen: Point) -> Effect {
        if self.pointers.remove(&pointer_id).is_none() {
            return Effect::None;
        }
        let world = self.viewport.screen_to_world(screen);

        match std::mem::take(&mut self.gesture) {
            Gesture::Idle | Gesture::Panning { .. } | Gesture::Erasing => Effect::None,
            Gesture::Pinching { .. } => {
                // One finger left: degrade to a pan under it.
                if let Some(&remaining) = self.pointers.values().next() {
                    self.gesture = Gesture::Panning {
                        grab: Point::new(
                            remaining.x - self.viewport.pan_x,
                            remaining.y - self.viewport.pan_y,
                        ),
                    };
                }
                Effect::None
            }
            Gesture::Drawing { samples } => {
                if samples.is_empty() {
                    return Effect::None;
                }
                let stroke = Stroke::new(self.pen_colour.clone(), samples, self.pen_size);
                self.state.create_stroke(stroke);
                Effect::DocChanged
            }
            Gesture::Selecting { start, .. } => {
                let rect = WorldRect::from_corners(start, world);
                self.selection.strokes =
                    hit::strokes_in_rect(self.state.strokes(), rect).into_iter().collect();
                self.selection.boxes =
                    hit::boxes_in_rect(self.state.boxes(), rect).into_iter().collect();
                Effect::ViewChanged
            }
            Gesture::DraggingSelection { stroke_origins, box_origins, .. } => {
                self.state
                    .commit_moved(stroke_origins.into_keys(), box_origins.into_keys());
                Effect::DocChanged
            }
            Gesture::ResizingBox { .. } => Effect::DocChanged,
        }
    }

    /// Abort whatever gesture the lost pointer was driving, discarding
    /// in-progress samples.
    pub fn pointer_cancel(&mut self, pointer_id: i64) -> Effect {
        if self.pointers.remove(&pointer_id).is_none() {
            return Effect::None;
        }
        self.gesture = Gesture::Idle;
        Effect::ViewChanged
    }

    // --- Keyboard ---

    /// Ctrl/Cmd plus or minus steps the zoom.
    pub fn key_down(&mut self, key: &str, modifiers: Modifiers) -> Effect {
        if !modifiers.primary() {
            return Effect::None;
        }
        match key {
            "+" | "=" => {
                self.viewport.zoom_step(1, self.viewport_width, self.viewport_height);
                Effect::ViewChanged
            }
            "-" => {
                self.viewport.zoom_step(-1, self.viewport_width, self.viewport_height);
                Effect::ViewChanged
            }
            _ => Effect::None,
        }
    }

    // --- Host commands ---

    /// Context-menu deletion of a text box.
    pub fn delete_box(&mut self, id: Uuid) -> Effect {
        self.state.delete_box(id);
        self.selection.boxes.remove(&id);
        Effect::DocChanged
    }

    /// Content change reported by the rich-text editor. Suppressed while a
    /// remote merge is in flight.
    pub fn set_box_content(&mut self, id: Uuid, content: serde_json::Value) -> Effect {
        if self.state.set_box_content(id, content) {
            Effect::DocChanged
        } else {
            Effect::None
        }
    }

    /// Start a resize from one of the eight handles. The handles are host
    /// chrome, so the grab arrives here instead of [`Engine::pointer_down`];
    /// the pointer is captured and subsequent moves drive the gesture.
    /// `rendered_height` is the box's current on-screen height, which
    /// resolves an `Auto` height to a number for the duration of the
    /// gesture.
    pub fn begin_box_resize(
        &mut self,
        pointer_id: i64,
        id: Uuid,
        anchor: ResizeAnchor,
        screen: Point,
        rendered_height: f64,
    ) -> Effect {
        let Some(text_box) = self.state.text_box(&id) else {
            return Effect::None;
        };
        self.pointers.insert(pointer_id, screen);
        let orig = BoxGeometry {
            x: text_box.x,
            y: text_box.y,
            width: text_box.width,
            height: text_box.height.fixed_or(rendered_height),
        };
        self.gesture = Gesture::ResizingBox {
            id,
            anchor,
            start: self.viewport.screen_to_world(screen),
            orig,
        };
        Effect::None
    }

    // --- Remote path ---

    /// Merge a peer's change-set into the store and refresh the outline
    /// cache. Stages nothing: the returned effect must not arm the
    /// autosave debounce.
    pub fn apply_remote(&mut self, change_set: &ChangeSet) -> Effect {
        let changed = self.state.apply_remote(change_set);
        for id in &changed {
            self.cache.invalidate(id);
        }
        let live = self.state.stroke_ids();
        self.cache.prune(&live);
        self.selection.strokes.retain(|id| live.contains(id));
        self.selection.boxes.retain(|id| self.state.boxes().contains_key(id));
        Effect::ViewChanged
    }

    // --- Internals ---

    fn begin_pinch(&mut self) -> Effect {
        let mut live = self.pointers.values();
        let (Some(&a), Some(&b)) = (live.next(), live.next()) else {
            return Effect::None;
        };
        let screen_mid = Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0);
        self.gesture = Gesture::Pinching {
            screen_mid,
            world_mid: self.viewport.screen_to_world(screen_mid),
            start_distance: a.distance(b).max(f64::EPSILON),
            start_scale: self.viewport.scale,
        };
        Effect::None
    }

    fn begin_selection_drag(&mut self, world: Point) -> Effect {
        let stroke_origins: HashMap<Uuid, Vec<Sample>> = self
            .selection
            .strokes
            .iter()
            .filter_map(|id| self.state.stroke(id).map(|s| (*id, s.points.clone())))
            .collect();
        let box_origins: HashMap<Uuid, (f64, f64)> = self
            .selection
            .boxes
            .iter()
            .filter_map(|id| self.state.text_box(id).map(|b| (*id, (b.x, b.y))))
            .collect();
        self.gesture = Gesture::DraggingSelection { start: world, stroke_origins, box_origins };
        Effect::None
    }

    fn erase(&mut self, world: Point) -> Effect {
        let removed = self.state.erase_at(world, ERASER_RADIUS);
        if removed.is_empty() {
            return Effect::None;
        }
        for id in &removed {
            self.cache.invalidate(id);
        }
        self.selection.strokes.retain(|id| !removed.contains(id));
        Effect::DocChanged
    }
}
