use crate::detect::result::Detection;

/// Greedy non-maximum suppression.
///
/// Keeps the highest-confidence box of every overlapping cluster; a box is
/// suppressed when its IoU with an already kept box exceeds `iou_threshold`.
/// Output is ordered by descending confidence.
pub fn nms(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    if detections.len() < 2 {
        return detections;
    }

    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<Detection> = Vec::with_capacity(detections.len());
    for candidate in detections {
        let overlaps = keep
            .iter()
            .any(|kept| kept.bbox.iou(&candidate.bbox) > iou_threshold);
        if !overlaps {
            keep.push(candidate);
        }
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suppresses_overlapping_lower_confidence_boxes() {
        let detections = vec![
            Detection::from_corners(0.0, 0.0, 100.0, 100.0, 0.7),
            Detection::from_corners(2.0, 2.0, 102.0, 102.0, 0.9),
            Detection::from_corners(300.0, 300.0, 400.0, 400.0, 0.5),
        ];

        let kept = nms(detections, 0.45);

        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].confidence, 0.9);
        assert_eq!(kept[1].confidence, 0.5);
    }

    #[test]
    fn keeps_touching_boxes_below_threshold() {
        let detections = vec![
            Detection::from_corners(0.0, 0.0, 100.0, 100.0, 0.8),
            Detection::from_corners(60.0, 0.0, 160.0, 100.0, 0.8),
        ];
        assert_eq!(nms(detections, 0.45).len(), 2);
    }
}
