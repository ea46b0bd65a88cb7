//! The change-set: every pending create/update/delete since the last save.
//!
//! DESIGN
//! ======
//! One bucket per entity kind and operation kind, keyed by id, so repeated
//! edits to the same entity collapse to a single entry holding the latest
//! value. Staging a delete evicts any pending save for that id; a save
//! staged after a local delete is ignored, because the delete already won
//! locally. The same struct travels the wire unchanged: what the sync
//! client submits is exactly what peers receive in a broadcast.

#[cfg(test)]
#[path = "change_test.rs"]
mod change_test;

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::{Stroke, TextBox};

/// Batched entity saves and deletes, at most one entry per id per bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSet {
    pub strokes_to_save: HashMap<Uuid, Stroke>,
    pub strokes_to_delete: HashSet<Uuid>,
    pub boxes_to_save: HashMap<Uuid, TextBox>,
    pub boxes_to_delete: HashSet<Uuid>,
}

impl ChangeSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a stroke for save, replacing any earlier pending value.
    /// Ignored if the stroke was already deleted locally.
    pub fn stage_stroke(&mut self, stroke: Stroke) {
        if self.strokes_to_delete.contains(&stroke.id) {
            return;
        }
        self.strokes_to_save.insert(stroke.id, stroke);
    }

    /// Stage a stroke deletion, evicting any pending save for the id.
    pub fn delete_stroke(&mut self, id: Uuid) {
        self.strokes_to_save.remove(&id);
        self.strokes_to_delete.insert(id);
    }

    /// Stage a text box for save, replacing any earlier pending value.
    /// Ignored if the box was already deleted locally.
    pub fn stage_box(&mut self, text_box: TextBox) {
        if self.boxes_to_delete.contains(&text_box.id) {
            return;
        }
        self.boxes_to_save.insert(text_box.id, text_box);
    }

    /// Stage a text box deletion, evicting any pending save for the id.
    pub fn delete_box(&mut self, id: Uuid) {
        self.boxes_to_save.remove(&id);
        self.boxes_to_delete.insert(id);
    }

    /// Fold another change-set into this one under the same collapse rules.
    pub fn merge(&mut self, other: ChangeSet) {
        for stroke in other.strokes_to_save.into_values() {
            self.stage_stroke(stroke);
        }
        for id in other.strokes_to_delete {
            self.delete_stroke(id);
        }
        for text_box in other.boxes_to_save.into_values() {
            self.stage_box(text_box);
        }
        for id in other.boxes_to_delete {
            self.delete_box(id);
        }
    }

    /// Drop exactly the entries acknowledged by the server.
    ///
    /// A save entry is cleared only when the pending value still equals
    /// the submitted one; an edit made during the round trip stays staged
    /// for the next cycle. Delete entries are cleared by id.
    pub fn clear_acked(&mut self, submitted: &ChangeSet) {
        for (id, stroke) in &submitted.strokes_to_save {
            if self.strokes_to_save.get(id) == Some(stroke) {
                self.strokes_to_save.remove(id);
            }
        }
        for id in &submitted.strokes_to_delete {
            self.strokes_to_delete.remove(id);
        }
        for (id, text_box) in &submitted.boxes_to_save {
            if self.boxes_to_save.get(id) == Some(text_box) {
                self.boxes_to_save.remove(id);
            }
        }
        for id in &submitted.boxes_to_delete {
            self.boxes_to_delete.remove(id);
        }
    }

    /// Total number of pending entries across all buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.strokes_to_save.len()
            + self.strokes_to_delete.len()
            + self.boxes_to_save.len()
            + self.boxes_to_delete.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
