use anyhow::Result;
use image::RgbImage;

use crate::detect::backend::LeafDetector;
use crate::detect::result::Detection;

/// Model-free detector for tests and smoke runs.
///
/// Without configured detections it proposes a single box covering the whole
/// image, so every upload reaches the classification stage.
#[derive(Clone, Debug, Default)]
pub struct StubDetector {
    detections: Option<Vec<Detection>>,
}

impl StubDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always return `detections`, regardless of the image.
    pub fn with_detections(detections: Vec<Detection>) -> Self {
        Self {
            detections: Some(detections),
        }
    }
}

impl LeafDetector for StubDetector {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>> {
        if let Some(fixed) = &self.detections {
            return Ok(fixed.clone());
        }
        if image.width() == 0 || image.height() == 0 {
            return Ok(Vec::new());
        }
        Ok(vec![Detection::from_corners(
            0.0,
            0.0,
            image.width() as f32,
            image.height() as f32,
            1.0,
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_detector_covers_whole_image() {
        let detector = StubDetector::new();
        let detections = detector.detect(&RgbImage::new(64, 48)).unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].bbox.width(), 64.0);
        assert_eq!(detections[0].bbox.height(), 48.0);
    }

    #[test]
    fn stub_detector_returns_fixed_detections() {
        let fixed = vec![Detection::from_corners(1.0, 2.0, 3.0, 4.0, 0.5)];
        let detector = StubDetector::with_detections(fixed.clone());
        assert_eq!(detector.detect(&RgbImage::new(10, 10)).unwrap(), fixed);

        let empty = StubDetector::with_detections(Vec::new());
        assert!(empty.detect(&RgbImage::new(10, 10)).unwrap().is_empty());
    }
}
