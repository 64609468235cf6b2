use serde::Serialize;

use crate::classify::{LeafLabel, RawClassification};
use crate::detect::Detection;

/// Final per-leaf class after confidence gating.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LeafClass {
    Healthy,
    Diseased,
    Uncertain,
}

impl LeafClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeafClass::Healthy => "healthy",
            LeafClass::Diseased => "diseased",
            LeafClass::Uncertain => "uncertain",
        }
    }
}

impl From<LeafLabel> for LeafClass {
    fn from(label: LeafLabel) -> Self {
        match label {
            LeafLabel::Healthy => LeafClass::Healthy,
            LeafLabel::Diseased => LeafClass::Diseased,
        }
    }
}

/// A detection with its gated class and the classifier's raw confidence.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClassifiedDetection {
    pub detection: Detection,
    pub class: LeafClass,
    /// Classifier confidence, kept even when the class was demoted.
    pub class_confidence: f32,
}

/// Accept the classifier's label when `confidence >= min_class_conf`,
/// otherwise demote it to `Uncertain`. A NaN confidence never clears the gate.
pub fn gate(
    detection: Detection,
    raw: RawClassification,
    min_class_conf: f32,
) -> ClassifiedDetection {
    let class = if raw.confidence >= min_class_conf {
        LeafClass::from(raw.label)
    } else {
        LeafClass::Uncertain
    };
    ClassifiedDetection {
        detection,
        class,
        class_confidence: raw.confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det() -> Detection {
        Detection::from_corners(0.0, 0.0, 50.0, 50.0, 0.8)
    }

    #[test]
    fn confident_labels_pass_through() {
        let healthy = gate(det(), RawClassification::healthy(0.9), 0.6);
        assert_eq!(healthy.class, LeafClass::Healthy);

        let diseased = gate(det(), RawClassification::diseased(0.6), 0.6);
        assert_eq!(diseased.class, LeafClass::Diseased);
    }

    #[test]
    fn low_confidence_is_uncertain_and_keeps_score() {
        for raw in [
            RawClassification::healthy(0.59),
            RawClassification::diseased(0.5),
            RawClassification::diseased(0.0),
        ] {
            let gated = gate(det(), raw, 0.6);
            assert_eq!(gated.class, LeafClass::Uncertain);
            assert_eq!(gated.class_confidence, raw.confidence);
            assert_eq!(gated.detection, det());
        }
    }

    #[test]
    fn nan_confidence_is_uncertain() {
        let gated = gate(det(), RawClassification::healthy(f32::NAN), 0.6);
        assert_eq!(gated.class, LeafClass::Uncertain);
    }
}
