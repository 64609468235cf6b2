//! Wire shape of an `Outcome`.
//!
//! All three outcome states serialise to the same envelope so clients can
//! branch on `status` alone: sentinel states carry an empty detection list
//! and a zeroed summary with null ratios.

use serde::Serialize;

use crate::pipeline::gate::{ClassifiedDetection, LeafClass};
use crate::pipeline::outcome::Outcome;
use crate::pipeline::tally::Tally;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PredictResponse {
    pub status: &'static str,
    pub detections: Vec<DetectionView>,
    pub summary: Summary,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DetectionView {
    /// `[x1, y1, x2, y2]` in source pixels.
    pub bbox: [f32; 4],
    pub det_conf: f32,
    pub class: LeafClass,
    pub cls_conf: f32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Summary {
    pub healthy: usize,
    pub diseased: usize,
    pub uncertain: usize,
    pub counted: usize,
    pub total_all: usize,
    /// Boxes dropped by the size filter.
    pub filtered: usize,
    pub health_ratio: Option<f64>,
    pub disease_incidence: Option<f64>,
}

impl From<&ClassifiedDetection> for DetectionView {
    fn from(d: &ClassifiedDetection) -> Self {
        Self {
            bbox: d.detection.bbox.to_array(),
            det_conf: d.detection.confidence,
            class: d.class,
            cls_conf: d.class_confidence,
        }
    }
}

impl Summary {
    fn from_tally(tally: Tally, filtered: usize) -> Self {
        let metrics = tally.metrics();
        Self {
            healthy: tally.healthy,
            diseased: tally.diseased,
            uncertain: tally.uncertain,
            counted: tally.counted(),
            total_all: tally.total_all(),
            filtered,
            health_ratio: metrics.map(|m| m.health_ratio),
            disease_incidence: metrics.map(|m| m.disease_incidence),
        }
    }
}

impl From<&Outcome> for PredictResponse {
    fn from(outcome: &Outcome) -> Self {
        let status = outcome.status_str();
        match outcome {
            Outcome::NoLeafDetected => Self {
                status,
                detections: Vec::new(),
                summary: Summary::default(),
            },
            Outcome::LeafNotClear { filtered } => Self {
                status,
                detections: Vec::new(),
                summary: Summary {
                    filtered: *filtered,
                    ..Summary::default()
                },
            },
            Outcome::Scored(assessment) => Self {
                status,
                detections: assessment
                    .detections()
                    .iter()
                    .map(DetectionView::from)
                    .collect(),
                summary: Summary::from_tally(assessment.tally(), assessment.filtered()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::RawClassification;
    use crate::detect::Detection;
    use crate::pipeline::gate::gate;
    use crate::pipeline::outcome::Assessment;
    use crate::pipeline::policy::IncidenceThresholds;
    use serde_json::json;

    #[test]
    fn no_leaf_serialises_with_null_ratios() {
        let value = serde_json::to_value(PredictResponse::from(&Outcome::NoLeafDetected)).unwrap();
        assert_eq!(
            value,
            json!({
                "status": "NoLeafDetected",
                "detections": [],
                "summary": {
                    "healthy": 0,
                    "diseased": 0,
                    "uncertain": 0,
                    "counted": 0,
                    "total_all": 0,
                    "filtered": 0,
                    "health_ratio": null,
                    "disease_incidence": null
                }
            })
        );
    }

    #[test]
    fn scored_response_lists_every_detection() {
        let detections = vec![
            gate(
                Detection::from_corners(0.0, 0.0, 50.0, 50.0, 0.75),
                RawClassification::diseased(0.5),
                0.6,
            ),
            gate(
                Detection::from_corners(10.0, 10.0, 90.0, 90.0, 0.5),
                RawClassification::healthy(0.875),
                0.6,
            ),
        ];
        let outcome = Outcome::Scored(Assessment::new(
            detections,
            0,
            &IncidenceThresholds::default(),
        ));

        let value = serde_json::to_value(PredictResponse::from(&outcome)).unwrap();

        assert_eq!(value["status"], "Healthy");
        assert_eq!(value["detections"][0]["class"], "uncertain");
        assert_eq!(value["detections"][0]["cls_conf"], 0.5);
        assert_eq!(value["detections"][0]["bbox"], json!([0.0, 0.0, 50.0, 50.0]));
        assert_eq!(value["detections"][1]["class"], "healthy");
        assert_eq!(value["detections"][1]["det_conf"], 0.5);
        assert_eq!(value["summary"]["counted"], 1);
        assert_eq!(value["summary"]["total_all"], 2);
        assert_eq!(value["summary"]["disease_incidence"], 0.0);
        assert_eq!(value["summary"]["health_ratio"], 1.0);
    }
}
