//! In-memory entity store plus the pending change-set (dirty tracker).
//!
//! DESIGN
//! ======
//! Every local mutator updates the entity map and the pending change-set
//! in one step, so the store and the dirty tracker can never disagree.
//! Drag previews are the one exception: `translate_stroke_from` and
//! `move_box_to` update only the map, and the engine stages the final
//! positions through `commit_moved` on release.
//!
//! `apply_remote` is the write path for peer broadcasts. It never touches
//! `pending`, and it raises `applying_remote` for its duration so host
//! callbacks fired by the merge (the rich-text editor reports content it
//! just received) do not re-stage what a peer already saved.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use std::collections::{HashMap, HashSet};

use uuid::Uuid;
use wire::{BoxHeight, ChangeSet, NoteSnapshot, Sample, Stroke, TextBox};

use crate::camera::Point;
use crate::hit::{self, BoxGeometry};

/// The local document: entity maps plus everything not yet saved.
#[derive(Debug, Default)]
pub struct CanvasState {
    strokes: HashMap<Uuid, Stroke>,
    boxes: HashMap<Uuid, TextBox>,
    pending: ChangeSet,
    /// Raised while a peer change-set is being merged; local-change hooks
    /// check it to suppress the reflexive echo.
    pub applying_remote: bool,
}

impl CanvasState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hydrate from a server snapshot. Stages nothing.
    pub fn load_snapshot(&mut self, snapshot: NoteSnapshot) {
        self.strokes = snapshot.strokes.into_iter().map(|s| (s.id, s)).collect();
        self.boxes = snapshot.text_boxes.into_iter().map(|b| (b.id, b)).collect();
        self.pending = ChangeSet::new();
    }

    // --- Queries ---

    #[must_use]
    pub fn strokes(&self) -> &HashMap<Uuid, Stroke> {
        &self.strokes
    }

    #[must_use]
    pub fn boxes(&self) -> &HashMap<Uuid, TextBox> {
        &self.boxes
    }

    #[must_use]
    pub fn stroke(&self, id: &Uuid) -> Option<&Stroke> {
        self.strokes.get(id)
    }

    #[must_use]
    pub fn text_box(&self, id: &Uuid) -> Option<&TextBox> {
        self.boxes.get(id)
    }

    #[must_use]
    pub fn pending(&self) -> &ChangeSet {
        &self.pending
    }

    pub fn pending_mut(&mut self) -> &mut ChangeSet {
        &mut self.pending
    }

    /// Ids of the strokes currently in the store.
    #[must_use]
    pub fn stroke_ids(&self) -> HashSet<Uuid> {
        self.strokes.keys().copied().collect()
    }

    // --- Local mutators (store + pending in one step) ---

    /// Insert a finished stroke and stage it for save.
    pub fn create_stroke(&mut self, stroke: Stroke) {
        self.pending.stage_stroke(stroke.clone());
        self.strokes.insert(stroke.id, stroke);
    }

    /// Remove a stroke and stage its deletion.
    pub fn delete_stroke(&mut self, id: Uuid) {
        self.strokes.remove(&id);
        self.pending.delete_stroke(id);
    }

    /// Remove every stroke with a sample within `radius` of `world`,
    /// staging each deletion. Returns the removed ids.
    pub fn erase_at(&mut self, world: Point, radius: f64) -> Vec<Uuid> {
        let hits = hit::erase_hits(&self.strokes, world, radius);
        for id in &hits {
            self.strokes.remove(id);
            self.pending.delete_stroke(*id);
        }
        hits
    }

    /// Preview a drag: set a stroke's samples to `origin` translated by
    /// `(dx, dy)`. Stages nothing; call [`Self::commit_moved`] on release.
    pub fn translate_stroke_from(&mut self, id: Uuid, origin: &[Sample], dx: f64, dy: f64) {
        if let Some(stroke) = self.strokes.get_mut(&id) {
            stroke.points = origin
                .iter()
                .map(|p| Sample::new(p.x + dx, p.y + dy, p.pressure))
                .collect();
        }
    }

    /// Preview a drag: move a box origin. Stages nothing.
    pub fn move_box_to(&mut self, id: Uuid, x: f64, y: f64) {
        if let Some(text_box) = self.boxes.get_mut(&id) {
            text_box.x = x;
            text_box.y = y;
        }
    }

    /// Stage the current values of previously previewed entities.
    pub fn commit_moved<S, B>(&mut self, stroke_ids: S, box_ids: B)
    where
        S: IntoIterator<Item = Uuid>,
        B: IntoIterator<Item = Uuid>,
    {
        for id in stroke_ids {
            if let Some(stroke) = self.strokes.get(&id) {
                self.pending.stage_stroke(stroke.clone());
            }
        }
        for id in box_ids {
            if let Some(text_box) = self.boxes.get(&id) {
                self.pending.stage_box(text_box.clone());
            }
        }
    }

    /// Create an empty text box at `(x, y)`, staged. Returns its id.
    pub fn create_box_at(&mut self, x: f64, y: f64) -> Uuid {
        let text_box = TextBox::new_at(x, y);
        let id = text_box.id;
        self.pending.stage_box(text_box.clone());
        self.boxes.insert(id, text_box);
        id
    }

    /// Apply resize geometry and stage the result. `fix_height` pins an
    /// `Auto` height to the resolved number once a vertical handle moves.
    pub fn resize_box_to(&mut self, id: Uuid, geom: BoxGeometry, fix_height: bool) {
        let Some(text_box) = self.boxes.get_mut(&id) else {
            return;
        };
        text_box.x = geom.x;
        text_box.y = geom.y;
        text_box.width = geom.width;
        if fix_height {
            text_box.height = BoxHeight::Fixed(geom.height);
        }
        self.pending.stage_box(text_box.clone());
    }

    /// Replace a box's rich-text content and stage it, unless the change
    /// is the editor echoing a merge in progress. Returns whether the
    /// change was staged.
    pub fn set_box_content(&mut self, id: Uuid, content: serde_json::Value) -> bool {
        if self.applying_remote {
            return false;
        }
        let Some(text_box) = self.boxes.get_mut(&id) else {
            return false;
        };
        text_box.content = content;
        self.pending.stage_box(text_box.clone());
        true
    }

    /// Remove a box and stage its deletion.
    pub fn delete_box(&mut self, id: Uuid) {
        self.boxes.remove(&id);
        self.pending.delete_box(id);
    }

    // --- Remote path ---

    /// Merge a peer's change-set: insert-or-replace saves by id, remove
    /// deletes by id. Never touches `pending`; idempotent per id.
    /// Returns the ids of strokes whose geometry changed, for outline
    /// cache invalidation.
    pub fn apply_remote(&mut self, change_set: &ChangeSet) -> Vec<Uuid> {
        self.applying_remote = true;

        let mut changed = Vec::new();
        for (id, stroke) in &change_set.strokes_to_save {
            if self.strokes.get(id) != Some(stroke) {
                changed.push(*id);
            }
            self.strokes.insert(*id, stroke.clone());
        }
        for id in &change_set.strokes_to_delete {
            self.strokes.remove(id);
        }
        for (id, text_box) in &change_set.boxes_to_save {
            self.boxes.insert(*id, text_box.clone());
        }
        for id in &change_set.boxes_to_delete {
            self.boxes.remove(id);
        }

        self.applying_remote = false;
        changed
    }
}
