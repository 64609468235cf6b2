use anyhow::{anyhow, Result};
use serde::Serialize;

/// Binary label a classifier may return. There is no adapter-level
/// "uncertain": uncertainty is decided by the pipeline's gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LeafLabel {
    Healthy,
    Diseased,
}

/// Raw classifier answer for one crop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RawClassification {
    pub label: LeafLabel,
    /// Class confidence in [0, 1].
    pub confidence: f32,
}

impl RawClassification {
    pub fn new(label: LeafLabel, confidence: f32) -> Self {
        Self { label, confidence }
    }

    pub fn healthy(confidence: f32) -> Self {
        Self::new(LeafLabel::Healthy, confidence)
    }

    pub fn diseased(confidence: f32) -> Self {
        Self::new(LeafLabel::Diseased, confidence)
    }

    /// Interpret two-class logits. `healthy_index` selects which output
    /// position is the healthy class; the other one is diseased.
    pub fn from_logits(logits: &[f32], healthy_index: usize) -> Result<Self> {
        if logits.len() != 2 {
            return Err(anyhow!(
                "binary classifier produced {} logits, expected 2",
                logits.len()
            ));
        }
        if healthy_index > 1 {
            return Err(anyhow!("healthy class index {} out of range", healthy_index));
        }
        let probs = softmax(logits);
        if probs.iter().any(|p| !p.is_finite()) {
            return Err(anyhow!("classifier produced non-finite scores"));
        }
        let diseased_index = 1 - healthy_index;
        // Ties go to diseased.
        if probs[healthy_index] > probs[diseased_index] {
            Ok(Self::healthy(probs[healthy_index]))
        } else {
            Ok(Self::diseased(probs[diseased_index]))
        }
    }
}

/// Numerically stable softmax.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|v| v / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn softmax_sums_to_one() {
        let probs = softmax(&[2.0, 0.5]);
        assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-6);
        assert!(probs[0] > probs[1]);
        assert!(softmax(&[1000.0, 999.0]).iter().all(|p| p.is_finite()));
    }

    #[test]
    fn logits_follow_label_index_mapping() {
        let raw = RawClassification::from_logits(&[0.0, 3.0], 1).unwrap();
        assert_eq!(raw.label, LeafLabel::Healthy);
        assert!(raw.confidence > 0.9);

        let flipped = RawClassification::from_logits(&[0.0, 3.0], 0).unwrap();
        assert_eq!(flipped.label, LeafLabel::Diseased);
        assert_eq!(flipped.confidence, raw.confidence);
    }

    #[test]
    fn rejects_wrong_arity_and_bad_index() {
        assert!(RawClassification::from_logits(&[0.1, 0.2, 0.7], 1).is_err());
        assert!(RawClassification::from_logits(&[0.1, 0.2], 2).is_err());
    }
}
