//! Variable-width stroke outlines and their per-stroke cache.
//!
//! DESIGN
//! ======
//! A stroke is rendered as a closed polygon: the input polyline is
//! low-pass filtered (`streamline`), each sample gets a pressure-scaled
//! radius, and perpendicular offsets on both sides form the outline
//! (left side forward, right side reversed). The outline is deterministic
//! for a given sample sequence, which is what makes caching by stroke id
//! sound: entries are invalidated only when geometry changes and pruned
//! when ids leave the store.

#[cfg(test)]
#[path = "outline_test.rs"]
mod outline_test;

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;

use uuid::Uuid;
use wire::{Sample, Stroke};

use crate::consts::{PEN_STREAMLINE, PEN_THINNING};

/// Number of segments used to approximate a single-sample dot.
const DOT_SEGMENTS: usize = 16;

/// Parameters for [`outline_stroke`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlineOptions {
    /// Pen diameter in world units.
    pub size: f64,
    /// How strongly pressure narrows the stroke, in `[0, 1]`.
    pub thinning: f64,
    /// Outline corner rounding factor, in `[0, 1]`.
    pub smoothing: f64,
    /// Input polyline low-pass factor, in `[0, 1)`.
    pub streamline: f64,
}

impl OutlineOptions {
    /// The defaults used for freehand pen strokes of the given size.
    #[must_use]
    pub fn for_stroke(size: f64) -> Self {
        Self {
            size,
            thinning: PEN_THINNING,
            smoothing: (size / 32.0).clamp(0.0, 1.0),
            streamline: PEN_STREAMLINE,
        }
    }

    fn radius_for(&self, pressure: f64) -> f64 {
        (self.size / 2.0) * (1.0 - self.thinning + self.thinning * pressure)
    }
}

/// Build the closed outline polygon for a sample sequence.
///
/// Returns world-space vertices in draw order; empty input yields an
/// empty outline, a single sample yields a pressure-sized dot.
#[must_use]
pub fn outline_stroke(points: &[Sample], options: &OutlineOptions) -> Vec<(f64, f64)> {
    if points.is_empty() {
        return Vec::new();
    }
    if points.len() == 1 {
        return dot_outline(points[0], options);
    }

    let smoothed = streamline(points, options.streamline);

    let mut left = Vec::with_capacity(smoothed.len());
    let mut right = Vec::with_capacity(smoothed.len());
    for (i, sample) in smoothed.iter().enumerate() {
        let radius = options.radius_for(sample.pressure);
        let (nx, ny) = direction_at(&smoothed, i);
        // Perpendicular to the direction of travel.
        let (px, py) = (-ny, nx);
        left.push((sample.x + px * radius, sample.y + py * radius));
        right.push((sample.x - px * radius, sample.y - py * radius));
    }

    let mut outline = left;
    outline.extend(right.into_iter().rev());
    smooth_outline(&outline, options.smoothing)
}

/// Closed path string for an outline, using quadratic midpoint
/// interpolation so the polygon renders without visible corners.
#[must_use]
pub fn outline_path(outline: &[(f64, f64)]) -> String {
    let Some(&(x0, y0)) = outline.first() else {
        return String::new();
    };

    let mut path = format!("M {x0} {y0} Q");
    for (i, &(x, y)) in outline.iter().enumerate() {
        let (nx, ny) = outline[(i + 1) % outline.len()];
        let (mx, my) = ((x + nx) / 2.0, (y + ny) / 2.0);
        let _ = write!(path, " {x} {y} {mx} {my}");
    }
    path.push_str(" Z");
    path
}

fn dot_outline(sample: Sample, options: &OutlineOptions) -> Vec<(f64, f64)> {
    let radius = options.radius_for(sample.pressure);
    (0..DOT_SEGMENTS)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let theta = std::f64::consts::TAU * (i as f64) / (DOT_SEGMENTS as f64);
            (sample.x + radius * theta.cos(), sample.y + radius * theta.sin())
        })
        .collect()
}

/// Low-pass the polyline: each output point pulls `1 - streamline` of the
/// way from its predecessor toward the raw sample.
fn streamline(points: &[Sample], streamline: f64) -> Vec<Sample> {
    let t = (1.0 - streamline).clamp(0.0, 1.0);
    let mut out = Vec::with_capacity(points.len());
    let mut prev = points[0];
    out.push(prev);
    for sample in &points[1..] {
        let next = Sample::new(
            prev.x + (sample.x - prev.x) * t,
            prev.y + (sample.y - prev.y) * t,
            sample.pressure,
        );
        out.push(next);
        prev = next;
    }
    out
}

/// Unit direction of travel at index `i`, by central difference.
fn direction_at(points: &[Sample], i: usize) -> (f64, f64) {
    let before = &points[i.saturating_sub(1)];
    let after = &points[(i + 1).min(points.len() - 1)];
    let (dx, dy) = (after.x - before.x, after.y - before.y);
    let len = dx.hypot(dy);
    if len < f64::EPSILON {
        (1.0, 0.0)
    } else {
        (dx / len, dy / len)
    }
}

/// One neighbor-averaging pass over the closed outline, weighted by
/// `smoothing`.
fn smooth_outline(outline: &[(f64, f64)], smoothing: f64) -> Vec<(f64, f64)> {
    let w = smoothing.clamp(0.0, 1.0);
    if w < f64::EPSILON || outline.len() < 3 {
        return outline.to_vec();
    }
    let n = outline.len();
    (0..n)
        .map(|i| {
            let (px, py) = outline[(i + n - 1) % n];
            let (x, y) = outline[i];
            let (nx, ny) = outline[(i + 1) % n];
            let (mx, my) = ((px + nx) / 2.0, (py + ny) / 2.0);
            (x + (mx - x) * w, y + (my - y) * w)
        })
        .collect()
}

/// Memoized outlines keyed by stroke id.
///
/// Invalidation is explicit: callers invalidate on geometry change
/// (remote replace, drag translation) and prune whenever ids leave the
/// store, so eviction is tied 1:1 to deletion.
#[derive(Debug, Default)]
pub struct OutlineCache {
    entries: HashMap<Uuid, Vec<(f64, f64)>>,
}

impl OutlineCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached outline for `stroke`, building it on first request.
    pub fn get_or_build(&mut self, stroke: &Stroke) -> &[(f64, f64)] {
        self.entries.entry(stroke.id).or_insert_with(|| {
            outline_stroke(&stroke.points, &OutlineOptions::for_stroke(stroke.size))
        })
    }

    /// Drop the entry for a stroke whose geometry changed.
    pub fn invalidate(&mut self, id: &Uuid) {
        self.entries.remove(id);
    }

    /// Drop every entry whose id is no longer in `live`.
    pub fn prune(&mut self, live: &HashSet<Uuid>) {
        self.entries.retain(|id, _| live.contains(id));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: &Uuid) -> bool {
        self.entries.contains_key(id)
    }
}
