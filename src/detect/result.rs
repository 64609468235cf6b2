use serde::Serialize;

/// Axis-aligned box in the image's native pixel space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Width in pixels. Degenerate boxes report zero.
    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    /// Height in pixels. Degenerate boxes report zero.
    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Intersection over union with another box.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);
        let intersection = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }

    /// Clip the box to a `width` x `height` raster.
    pub fn clip_to(&self, width: u32, height: u32) -> BoundingBox {
        let w = width as f32;
        let h = height as f32;
        BoundingBox {
            x1: self.x1.clamp(0.0, w),
            y1: self.y1.clamp(0.0, h),
            x2: self.x2.clamp(0.0, w),
            y2: self.y2.clamp(0.0, h),
        }
    }

    /// `[x1, y1, x2, y2]`, the wire order used in responses.
    pub fn to_array(&self) -> [f32; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

/// A candidate leaf region proposed by a detector.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    pub bbox: BoundingBox,
    /// Detector confidence in [0, 1].
    pub confidence: f32,
}

impl Detection {
    pub fn new(bbox: BoundingBox, confidence: f32) -> Self {
        Self { bbox, confidence }
    }

    pub fn from_corners(x1: f32, y1: f32, x2: f32, y2: f32, confidence: f32) -> Self {
        Self::new(BoundingBox::new(x1, y1, x2, y2), confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate_box_has_zero_extent() {
        let b = BoundingBox::new(10.0, 10.0, 5.0, 30.0);
        assert_eq!(b.width(), 0.0);
        assert_eq!(b.height(), 20.0);
        assert_eq!(b.area(), 0.0);
    }

    #[test]
    fn iou_of_identical_and_disjoint_boxes() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(20.0, 20.0, 30.0, 30.0);
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
        assert_eq!(a.iou(&b), 0.0);

        let half = BoundingBox::new(5.0, 0.0, 15.0, 10.0);
        assert!((a.iou(&half) - 50.0 / 150.0).abs() < 1e-6);
    }

    #[test]
    fn clip_keeps_box_inside_raster() {
        let b = BoundingBox::new(-5.0, 10.0, 120.0, 90.0).clip_to(100, 80);
        assert_eq!(b, BoundingBox::new(0.0, 10.0, 100.0, 80.0));

        let outside = BoundingBox::new(150.0, 150.0, 200.0, 200.0).clip_to(100, 80);
        assert_eq!(outside.width(), 0.0);
        assert_eq!(outside.height(), 0.0);
    }
}
