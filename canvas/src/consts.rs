//! Shared numeric constants for the canvas crate.

// ── Document / camera ───────────────────────────────────────────

/// World-space side length of the (square) document.
pub const DOC_SIZE: f64 = 5000.0;

/// Lower bound for the viewport scale factor.
pub const MIN_SCALE: f64 = 0.3;

/// Upper bound for the viewport scale factor.
pub const MAX_SCALE: f64 = 3.0;

/// Fraction of the raw pinch ratio applied per move; softens jittery
/// two-finger input.
pub const PINCH_DAMPING: f64 = 0.6;

/// Scale delta per keyboard zoom step (Ctrl/Cmd plus or minus).
pub const KEY_ZOOM_STEP: f64 = 0.1;

// ── Editing ─────────────────────────────────────────────────────

/// World-space radius around the eraser point; a stroke is removed when
/// any of its samples falls inside. Tunable, not a wire contract.
pub const ERASER_RADIUS: f64 = 5.0;

/// Minimum width/height a text box can be resized down to.
pub const MIN_BOX_SIZE: f64 = 24.0;

// ── Sync ────────────────────────────────────────────────────────

/// Quiet period after the last local edit before a save is submitted.
pub const DEBOUNCE_MS: u64 = 2500;

// ── Outline renderer ────────────────────────────────────────────

/// How strongly pressure narrows the stroke (0 = constant width).
pub const PEN_THINNING: f64 = 0.11;

/// Input polyline low-pass factor; near zero keeps raw samples.
pub const PEN_STREAMLINE: f64 = 0.01;
