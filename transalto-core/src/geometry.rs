//! Bounding-box normalization onto the 0-1000 grid used by layout models.

use crate::types::{BoundingBox, NormalizedBox};

/// Upper bound of the normalized coordinate space
pub const GRID_MAX: u32 = 1000;

/// Rescale raw boxes against the page size.
///
/// A page with zero (or otherwise unusable) width or height yields all-zero
/// boxes instead of an error; callers treat those as "no usable layout".
pub fn normalize_boxes(boxes: &[BoundingBox], width: f64, height: f64) -> Vec<NormalizedBox> {
    if !(width > 0.0 && height > 0.0) || !width.is_finite() || !height.is_finite() {
        return vec![NormalizedBox::ZERO; boxes.len()];
    }

    let x_scale = f64::from(GRID_MAX) / width;
    let y_scale = f64::from(GRID_MAX) / height;

    boxes
        .iter()
        .map(|b| NormalizedBox {
            x1: scale(b.x1, x_scale),
            y1: scale(b.y1, y_scale),
            x2: scale(b.x2, x_scale),
            y2: scale(b.y2, y_scale),
        })
        .collect()
}

fn scale(value: f64, factor: f64) -> u32 {
    let scaled = (value * factor).round_ties_even();
    if scaled.is_nan() {
        return 0;
    }
    scaled.clamp(0.0, f64::from(GRID_MAX)) as u32
}
