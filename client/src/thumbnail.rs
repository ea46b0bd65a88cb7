//! Note thumbnail rasterizer.
//!
//! Renders the whole 5000x5000 world into a small square PNG: strokes
//! are stamped as pressure-scaled disks along their polylines, text
//! boxes as outlined rectangles. The output is deterministic for a given
//! document, and travels base64-encoded inside `SaveChangeSet`.

#[cfg(test)]
#[path = "thumbnail_test.rs"]
mod thumbnail_test;

use std::collections::HashMap;
use std::io::Cursor;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::{ImageFormat, Rgba, RgbaImage};
use uuid::Uuid;
use wire::{Stroke, TextBox};

use canvas::consts::DOC_SIZE;

/// Default thumbnail edge length in pixels.
pub const THUMBNAIL_PX: u32 = 256;

/// Canvas background, matching the app theme.
const BACKGROUND: Rgba<u8> = Rgba([0x0c, 0x0a, 0x09, 0xff]);

/// Box border colour.
const BOX_BORDER: Rgba<u8> = Rgba([0x57, 0x53, 0x4e, 0xff]);

/// Fallback ink for unparseable stroke colours.
const DEFAULT_INK: Rgba<u8> = Rgba([0xe7, 0xe5, 0xe4, 0xff]);

/// Render the document into a `px` by `px` PNG.
///
/// # Errors
/// Returns an error only if PNG encoding fails.
pub fn render_thumbnail(
    strokes: &HashMap<Uuid, Stroke>,
    boxes: &HashMap<Uuid, TextBox>,
    px: u32,
) -> Result<Vec<u8>, image::ImageError> {
    let mut img = RgbaImage::from_pixel(px, px, BACKGROUND);
    let scale = f64::from(px) / DOC_SIZE;

    // Iterate in id order so the stamp order, and therefore the bytes,
    // are stable across runs.
    let mut box_ids: Vec<&Uuid> = boxes.keys().collect();
    box_ids.sort_unstable();
    for id in box_ids {
        stamp_box(&mut img, &boxes[id], scale);
    }

    let mut stroke_ids: Vec<&Uuid> = strokes.keys().collect();
    stroke_ids.sort_unstable();
    for id in stroke_ids {
        stamp_stroke(&mut img, &strokes[id], scale);
    }

    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// Base64 data URL for a rendered PNG, as sent on the wire.
#[must_use]
pub fn thumbnail_data_url(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}

fn stamp_stroke(img: &mut RgbaImage, stroke: &Stroke, scale: f64) {
    let ink = parse_colour(&stroke.colour);
    if stroke.points.len() == 1 {
        let p = &stroke.points[0];
        stamp_disk(img, p.x * scale, p.y * scale, radius_px(stroke, p.pressure, scale), ink);
        return;
    }
    for pair in stroke.points.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        let (ax, ay) = (a.x * scale, a.y * scale);
        let (bx, by) = (b.x * scale, b.y * scale);
        let length = (bx - ax).hypot(by - ay);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let steps = (length.ceil() as u32).max(1);
        for step in 0..=steps {
            let t = f64::from(step) / f64::from(steps);
            let pressure = a.pressure + (b.pressure - a.pressure) * t;
            stamp_disk(
                img,
                ax + (bx - ax) * t,
                ay + (by - ay) * t,
                radius_px(stroke, pressure, scale),
                ink,
            );
        }
    }
}

fn radius_px(stroke: &Stroke, pressure: f64, scale: f64) -> f64 {
    ((stroke.size / 2.0) * (0.5 + pressure / 2.0) * scale).max(0.5)
}

fn stamp_disk(img: &mut RgbaImage, cx: f64, cy: f64, radius: f64, ink: Rgba<u8>) {
    #[allow(clippy::cast_possible_truncation)]
    let (x0, x1) = ((cx - radius).floor() as i64, (cx + radius).ceil() as i64);
    #[allow(clippy::cast_possible_truncation)]
    let (y0, y1) = ((cy - radius).floor() as i64, (cy + radius).ceil() as i64);
    for y in y0..=y1 {
        for x in x0..=x1 {
            #[allow(clippy::cast_precision_loss)]
            let inside = ((x as f64) - cx).hypot((y as f64) - cy) <= radius;
            if inside {
                put_pixel_clipped(img, x, y, ink);
            }
        }
    }
}

fn stamp_box(img: &mut RgbaImage, text_box: &TextBox, scale: f64) {
    #[allow(clippy::cast_possible_truncation)]
    let (x0, y0) = ((text_box.x * scale) as i64, (text_box.y * scale) as i64);
    let height = text_box.height.fixed_or(text_box.width / 2.0);
    #[allow(clippy::cast_possible_truncation)]
    let (x1, y1) = (
        ((text_box.x + text_box.width) * scale).ceil() as i64,
        ((text_box.y + height) * scale).ceil() as i64,
    );
    for x in x0..=x1 {
        put_pixel_clipped(img, x, y0, BOX_BORDER);
        put_pixel_clipped(img, x, y1, BOX_BORDER);
    }
    for y in y0..=y1 {
        put_pixel_clipped(img, x0, y, BOX_BORDER);
        put_pixel_clipped(img, x1, y, BOX_BORDER);
    }
}

fn put_pixel_clipped(img: &mut RgbaImage, x: i64, y: i64, ink: Rgba<u8>) {
    if x < 0 || y < 0 {
        return;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let (x, y) = (x as u32, y as u32);
    if x < img.width() && y < img.height() {
        img.put_pixel(x, y, ink);
    }
}

/// Parse a `#rrggbb` CSS colour, falling back to the default ink.
fn parse_colour(colour: &str) -> Rgba<u8> {
    let hex = colour.strip_prefix('#').unwrap_or(colour);
    if hex.len() != 6 {
        return DEFAULT_INK;
    }
    let Ok(value) = u32::from_str_radix(hex, 16) else {
        return DEFAULT_INK;
    };
    #[allow(clippy::cast_possible_truncation)]
    Rgba([(value >> 16) as u8, (value >> 8) as u8, value as u8, 0xff])
}
