#[cfg(test)]
#[path = "camera_test.rs"]
mod camera_test;

use crate::consts::{DOC_SIZE, KEY_ZOOM_STEP, MAX_SCALE, MIN_SCALE};

/// A point in either screen or world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Camera state for pan/zoom over the fixed-size document.
///
/// `pan_x` / `pan_y` are in screen pixels; `scale` is a zoom factor
/// (1.0 = no zoom) clamped to `[MIN_SCALE, MAX_SCALE]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub pan_x: f64,
    pub pan_y: f64,
    pub scale: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { pan_x: 0.0, pan_y: 0.0, scale: 1.0 }
    }
}

/// Clamp a scale factor to the permitted zoom range.
#[must_use]
pub fn clamp_scale(scale: f64) -> f64 {
    scale.clamp(MIN_SCALE, MAX_SCALE)
}

impl Viewport {
    /// Convert a screen-space point to world coordinates.
    #[must_use]
    pub fn screen_to_world(&self, screen: Point) -> Point {
        Point {
            x: (screen.x - self.pan_x) / self.scale,
            y: (screen.y - self.pan_y) / self.scale,
        }
    }

    /// Convert a world-space point to screen coordinates.
    #[must_use]
    pub fn world_to_screen(&self, world: Point) -> Point {
        Point {
            x: world.x * self.scale + self.pan_x,
            y: world.y * self.scale + self.pan_y,
        }
    }

    /// Keep the document covering the viewport: pan never exposes space
    /// left/above the origin, nor right/below the far document edge.
    pub fn clamp_pan(&mut self, viewport_w: f64, viewport_h: f64) {
        self.pan_x = f64::min(0.0, f64::max(self.pan_x, viewport_w - DOC_SIZE * self.scale));
        self.pan_y = f64::min(0.0, f64::max(self.pan_y, viewport_h - DOC_SIZE * self.scale));
    }

    /// Set the scale while keeping the world point under `focus` (a
    /// screen-space point) stationary, then re-clamp the pan.
    pub fn set_scale_about(&mut self, scale: f64, focus: Point, viewport_w: f64, viewport_h: f64) {
        let world = self.screen_to_world(focus);
        self.scale = clamp_scale(scale);
        self.pan_x = focus.x - world.x * self.scale;
        self.pan_y = focus.y - world.y * self.scale;
        self.clamp_pan(viewport_w, viewport_h);
    }

    /// Keyboard zoom: step the scale by `KEY_ZOOM_STEP` in `direction`
    /// (positive = in), anchored on the viewport centre.
    pub fn zoom_step(&mut self, direction: i32, viewport_w: f64, viewport_h: f64) {
        let target = self.scale + KEY_ZOOM_STEP * f64::from(direction.signum());
        let centre = Point::new(viewport_w / 2.0, viewport_h / 2.0);
        self.set_scale_about(target, centre, viewport_w, viewport_h);
    }
}
