//! Decoding of YOLO-style detection heads.
//!
//! The exported leaf detector produces a `[1, 4 + num_classes, num_anchors]`
//! tensor: centre-x, centre-y, width, height in model-input pixels, followed
//! by one score row per class.

use anyhow::{anyhow, Result};

use crate::detect::nms::nms;
use crate::detect::result::Detection;

/// Geometry needed to map model-input coordinates back to the source image.
#[derive(Clone, Copy, Debug)]
pub struct InputGeometry {
    pub model_size: u32,
    pub image_width: u32,
    pub image_height: u32,
}

/// Decode a flat `[1, 4 + C, N]` output into image-space detections.
///
/// Anchors whose best class score does not exceed `confidence_threshold` are
/// discarded before non-maximum suppression.
pub fn decode_output(
    output: &[f32],
    shape: &[usize],
    geometry: InputGeometry,
    confidence_threshold: f32,
    iou_threshold: f32,
) -> Result<Vec<Detection>> {
    if shape.len() != 3 {
        return Err(anyhow!("expected 3D detector output, got {}D", shape.len()));
    }
    let rows = shape[1];
    let anchors = shape[2];
    if rows < 5 {
        return Err(anyhow!(
            "detector output has {} rows, need at least 5 (4 box + 1 class)",
            rows
        ));
    }
    let expected = shape[0] * rows * anchors;
    if output.len() != expected {
        return Err(anyhow!(
            "detector output length {} does not match shape {:?}",
            output.len(),
            shape
        ));
    }

    let at = |row: usize, anchor: usize| output[row * anchors + anchor];
    let scale_x = geometry.image_width as f32 / geometry.model_size as f32;
    let scale_y = geometry.image_height as f32 / geometry.model_size as f32;

    let mut candidates = Vec::new();
    for anchor in 0..anchors {
        let score = (4..rows)
            .map(|row| at(row, anchor))
            .fold(f32::NEG_INFINITY, f32::max);
        if !(score > confidence_threshold) {
            continue;
        }

        let cx = at(0, anchor);
        let cy = at(1, anchor);
        let w = at(2, anchor);
        let h = at(3, anchor);

        candidates.push(Detection::from_corners(
            (cx - w / 2.0) * scale_x,
            (cy - h / 2.0) * scale_y,
            (cx + w / 2.0) * scale_x,
            (cy + h / 2.0) * scale_y,
            score.clamp(0.0, 1.0),
        ));
    }

    Ok(nms(candidates, iou_threshold))
}
