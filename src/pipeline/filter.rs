use crate::detect::Detection;

/// Keep detections at least `min_box_size` pixels wide AND tall.
///
/// Returns the survivors in input order and how many were dropped. Dropped
/// boxes are detector noise, not errors.
pub fn filter_boxes(detections: Vec<Detection>, min_box_size: f32) -> (Vec<Detection>, usize) {
    let before = detections.len();
    let kept: Vec<Detection> = detections
        .into_iter()
        .filter(|d| d.bbox.width() >= min_box_size && d.bbox.height() >= min_box_size)
        .collect();
    let dropped = before - kept.len();
    (kept, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_boxes_small_in_either_dimension() {
        let detections = vec![
            Detection::from_corners(0.0, 0.0, 5.0, 5.0, 0.9),
            Detection::from_corners(0.0, 0.0, 100.0, 10.0, 0.9),
            Detection::from_corners(0.0, 0.0, 10.0, 100.0, 0.9),
            Detection::from_corners(10.0, 10.0, 30.0, 30.0, 0.4),
        ];

        let (kept, dropped) = filter_boxes(detections, 20.0);

        assert_eq!(dropped, 3);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].confidence, 0.4);
    }

    #[test]
    fn boundary_size_is_kept() {
        let exact = vec![Detection::from_corners(0.0, 0.0, 20.0, 20.0, 0.9)];
        let (kept, dropped) = filter_boxes(exact, 20.0);
        assert_eq!((kept.len(), dropped), (1, 0));
    }

    #[test]
    fn empty_input_is_empty_output() {
        let (kept, dropped) = filter_boxes(Vec::new(), 20.0);
        assert!(kept.is_empty());
        assert_eq!(dropped, 0);
    }
}
