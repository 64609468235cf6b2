use anyhow::Result;
use image::RgbImage;

use crate::classify::backend::LeafClassifier;
use crate::classify::result::RawClassification;

type ClassifyFn = dyn Fn(&RgbImage) -> Result<RawClassification> + Send + Sync;

/// Model-free classifier for tests and smoke runs.
///
/// Answers a fixed classification, or delegates to a caller-supplied function
/// when per-crop answers are needed.
pub struct StubClassifier {
    answer: Answer,
}

enum Answer {
    Fixed(RawClassification),
    Func(Box<ClassifyFn>),
}

impl StubClassifier {
    /// Every crop is healthy with full confidence.
    pub fn new() -> Self {
        Self::fixed(RawClassification::healthy(1.0))
    }

    pub fn fixed(answer: RawClassification) -> Self {
        Self {
            answer: Answer::Fixed(answer),
        }
    }

    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&RgbImage) -> Result<RawClassification> + Send + Sync + 'static,
    {
        Self {
            answer: Answer::Func(Box::new(f)),
        }
    }
}

impl Default for StubClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl LeafClassifier for StubClassifier {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn classify(&self, crop: &RgbImage) -> Result<RawClassification> {
        match &self.answer {
            Answer::Fixed(answer) => Ok(*answer),
            Answer::Func(f) => f(crop),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::result::LeafLabel;
    use anyhow::anyhow;

    #[test]
    fn fixed_and_fn_answers() {
        let crop = RgbImage::new(8, 8);
        assert_eq!(
            StubClassifier::new().classify(&crop).unwrap(),
            RawClassification::healthy(1.0)
        );

        let by_width = StubClassifier::from_fn(|crop| {
            if crop.width() > 4 {
                Ok(RawClassification::diseased(0.8))
            } else {
                Err(anyhow!("crop too small"))
            }
        });
        assert_eq!(by_width.classify(&crop).unwrap().label, LeafLabel::Diseased);
        assert!(by_width.classify(&RgbImage::new(2, 2)).is_err());
    }
}
