//! Leaf-health aggregation pipeline.
//!
//! image → detector → clip + size filter → (per box) crop → classifier →
//! confidence gate → tally → incidence policy → `Outcome`.
//!
//! The pipeline itself holds no mutable state and performs no I/O; all
//! suspension and failure modes live in the injected adapters.

mod filter;
mod gate;
mod outcome;
mod policy;
mod response;
mod tally;

use std::sync::Arc;

use anyhow::{anyhow, Result};

use crate::classify::LeafClassifier;
use crate::detect::LeafDetector;
use crate::error::PipelineError;
use crate::frame::{decode_image, LeafImage};

pub use filter::filter_boxes;
pub use gate::{gate, ClassifiedDetection, LeafClass};
pub use outcome::{Assessment, Outcome, STATUS_LEAF_NOT_CLEAR, STATUS_NO_LEAF};
pub use policy::{
    score, HealthStatus, IncidenceThresholds, Verdict, DEFAULT_MODERATE_INCIDENCE,
    DEFAULT_UNHEALTHY_INCIDENCE,
};
pub use response::{DetectionView, PredictResponse, Summary};
pub use tally::{Metrics, Tally};

pub const DEFAULT_MIN_BOX_SIZE: f32 = 20.0;
pub const DEFAULT_MIN_CLASS_CONF: f32 = 0.6;

/// Tunables of the aggregation pipeline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PipelineConfig {
    /// Minimum box width and height, in pixels.
    pub min_box_size: f32,
    /// Minimum classifier confidence for a label to count.
    pub min_class_conf: f32,
    pub thresholds: IncidenceThresholds,
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.min_box_size.is_finite() || self.min_box_size < 0.0 {
            return Err(anyhow!(
                "min_box_size must be a finite non-negative pixel count (got {})",
                self.min_box_size
            ));
        }
        if !(0.0..=1.0).contains(&self.min_class_conf) {
            return Err(anyhow!(
                "min_class_conf must lie in [0, 1] (got {})",
                self.min_class_conf
            ));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_box_size: DEFAULT_MIN_BOX_SIZE,
            min_class_conf: DEFAULT_MIN_CLASS_CONF,
            thresholds: IncidenceThresholds::default(),
        }
    }
}

/// Detect-then-classify pipeline over injected model adapters.
#[derive(Clone)]
pub struct LeafHealthPipeline {
    detector: Arc<dyn LeafDetector>,
    classifier: Arc<dyn LeafClassifier>,
    config: PipelineConfig,
}

impl LeafHealthPipeline {
    pub fn new(
        detector: Arc<dyn LeafDetector>,
        classifier: Arc<dyn LeafClassifier>,
        config: PipelineConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            detector,
            classifier,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn detector_name(&self) -> &'static str {
        self.detector.name()
    }

    pub fn classifier_name(&self) -> &'static str {
        self.classifier.name()
    }

    /// Run both adapters once on a blank image.
    pub fn warm_up(&self) -> Result<()> {
        self.detector.warm_up()?;
        self.classifier.warm_up()
    }

    /// Decode `bytes` and evaluate the image.
    pub fn evaluate_bytes(&self, bytes: &[u8]) -> Result<Outcome, PipelineError> {
        let image = decode_image(bytes)?;
        self.evaluate(&image)
    }

    /// Evaluate one decoded image.
    ///
    /// Adapter failures propagate; they are never turned into an outcome.
    pub fn evaluate(&self, image: &LeafImage) -> Result<Outcome, PipelineError> {
        let proposed = self
            .detector
            .detect(image.rgb())
            .map_err(|source| PipelineError::Detector {
                backend: self.detector.name(),
                source,
            })?;
        if proposed.is_empty() {
            log::debug!("no leaf proposed (image {})", image.digest_hex());
            return Ok(Outcome::NoLeafDetected);
        }

        let (kept, filtered) = filter_boxes(proposed, self.config.min_box_size);
        if kept.is_empty() {
            log::debug!(
                "all {} proposed boxes below {}px",
                filtered,
                self.config.min_box_size
            );
            return Ok(Outcome::LeafNotClear { filtered });
        }

        let mut classified = Vec::with_capacity(kept.len());
        for (index, detection) in kept.into_iter().enumerate() {
            // Boxes stay as the detector produced them; only the crop is clipped.
            let crop = image.crop(&detection.bbox);
            let raw = self
                .classifier
                .classify(&crop)
                .map_err(|source| PipelineError::Classifier {
                    backend: self.classifier.name(),
                    index,
                    source,
                })?;
            let gated = gate(detection, raw, self.config.min_class_conf);
            log::debug!(
                "detection {}: box={:?} det_conf={:.3} raw={:?} -> {} ({:.3})",
                index,
                gated.detection.bbox.to_array(),
                gated.detection.confidence,
                raw.label,
                gated.class.as_str(),
                gated.class_confidence
            );
            classified.push(gated);
        }

        Ok(Outcome::Scored(Assessment::new(
            classified,
            filtered,
            &self.config.thresholds,
        )))
    }
}
