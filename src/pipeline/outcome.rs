use crate::pipeline::gate::ClassifiedDetection;
use crate::pipeline::policy::{score, IncidenceThresholds, Verdict};
use crate::pipeline::tally::Tally;

pub const STATUS_NO_LEAF: &str = "NoLeafDetected";
pub const STATUS_LEAF_NOT_CLEAR: &str = "LeafNotClear";

/// Terminal result of one `evaluate` call.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// The detector proposed nothing.
    NoLeafDetected,
    /// Boxes were proposed but all of them were too small to use.
    LeafNotClear { filtered: usize },
    /// At least one box survived the size filter.
    Scored(Assessment),
}

impl Outcome {
    pub fn status_str(&self) -> &'static str {
        match self {
            Outcome::NoLeafDetected => STATUS_NO_LEAF,
            Outcome::LeafNotClear { .. } => STATUS_LEAF_NOT_CLEAR,
            Outcome::Scored(assessment) => assessment.verdict.status_str(),
        }
    }

    pub fn assessment(&self) -> Option<&Assessment> {
        match self {
            Outcome::Scored(assessment) => Some(assessment),
            _ => None,
        }
    }
}

/// Classified detections with their tally and verdict.
#[derive(Clone, Debug, PartialEq)]
pub struct Assessment {
    detections: Vec<ClassifiedDetection>,
    tally: Tally,
    verdict: Verdict,
    filtered: usize,
}

impl Assessment {
    /// Tally and score gated detections. `filtered` is the number of boxes
    /// the size filter dropped before classification.
    pub fn new(
        detections: Vec<ClassifiedDetection>,
        filtered: usize,
        thresholds: &IncidenceThresholds,
    ) -> Self {
        let tally = Tally::from_detections(&detections);
        let verdict = score(&tally, thresholds);
        Self {
            detections,
            tally,
            verdict,
            filtered,
        }
    }

    pub fn detections(&self) -> &[ClassifiedDetection] {
        &self.detections
    }

    pub fn tally(&self) -> Tally {
        self.tally
    }

    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    pub fn filtered(&self) -> usize {
        self.filtered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::RawClassification;
    use crate::detect::Detection;
    use crate::pipeline::gate::gate;
    use crate::pipeline::policy::HealthStatus;

    fn classified(raw: RawClassification) -> ClassifiedDetection {
        gate(Detection::from_corners(0.0, 0.0, 40.0, 40.0, 0.9), raw, 0.6)
    }

    #[test]
    fn sentinel_statuses_are_distinct() {
        assert_eq!(Outcome::NoLeafDetected.status_str(), "NoLeafDetected");
        assert_eq!(
            Outcome::LeafNotClear { filtered: 2 }.status_str(),
            "LeafNotClear"
        );
        assert!(Outcome::NoLeafDetected.assessment().is_none());
    }

    #[test]
    fn assessment_scores_its_detections() {
        let assessment = Assessment::new(
            vec![
                classified(RawClassification::healthy(0.9)),
                classified(RawClassification::healthy(0.8)),
                classified(RawClassification::diseased(0.3)),
            ],
            1,
            &IncidenceThresholds::default(),
        );

        assert_eq!(assessment.tally().healthy, 2);
        assert_eq!(assessment.tally().uncertain, 1);
        assert_eq!(assessment.filtered(), 1);
        assert!(matches!(
            assessment.verdict(),
            Verdict::Scored {
                status: HealthStatus::Healthy,
                ..
            }
        ));
        assert_eq!(Outcome::Scored(assessment).status_str(), "Healthy");
    }
}
