//! Backend selection: turns `ModelSettings` into a detector + classifier
//! pair, loaded once and shared by every request.

use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, Result};

use crate::classify::{LeafClassifier, StubClassifier};
use crate::config::{LeafHealthConfig, ModelSettings};
use crate::detect::{LeafDetector, StubDetector};
use crate::pipeline::LeafHealthPipeline;

/// Known model backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    /// Model-free adapters; whole-image box, always healthy.
    Stub,
    /// ONNX models executed with tract.
    Tract,
}

impl BackendKind {
    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::Stub => "stub",
            BackendKind::Tract => "tract",
        }
    }

    /// Whether this binary was built with support for the backend.
    pub fn is_available(&self) -> bool {
        match self {
            BackendKind::Stub => true,
            BackendKind::Tract => cfg!(feature = "backend-tract"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "stub" => Ok(BackendKind::Stub),
            "tract" => Ok(BackendKind::Tract),
            other => Err(anyhow!("unknown model backend '{}'", other)),
        }
    }
}

/// Detector and classifier of one backend.
#[derive(Clone)]
pub struct ModelAdapters {
    pub detector: Arc<dyn LeafDetector>,
    pub classifier: Arc<dyn LeafClassifier>,
}

/// Load the adapters named by `settings.backend`.
pub fn load_adapters(settings: &ModelSettings) -> Result<ModelAdapters> {
    let kind: BackendKind = settings.backend.parse()?;
    if !kind.is_available() {
        return Err(anyhow!(
            "backend '{}' is not compiled in (enable the backend-{} feature)",
            kind.name(),
            kind.name()
        ));
    }
    match kind {
        BackendKind::Stub => {
            log::warn!("using stub model backend; predictions are not meaningful");
            Ok(ModelAdapters {
                detector: Arc::new(StubDetector::new()),
                classifier: Arc::new(StubClassifier::new()),
            })
        }
        BackendKind::Tract => load_tract(settings),
    }
}

#[cfg(feature = "backend-tract")]
fn load_tract(settings: &ModelSettings) -> Result<ModelAdapters> {
    use crate::classify::TractClassifier;
    use crate::detect::TractDetector;

    let detector_path = settings
        .detector_path
        .as_ref()
        .ok_or_else(|| anyhow!("tract backend requires a detector model path"))?;
    let classifier_path = settings
        .classifier_path
        .as_ref()
        .ok_or_else(|| anyhow!("tract backend requires a classifier model path"))?;

    log::info!("loading detector model {}", detector_path.display());
    let detector = TractDetector::new(detector_path, settings.detector_input)?
        .with_threshold(settings.detector_confidence)
        .with_iou_threshold(settings.nms_iou);
    log::info!("loading classifier model {}", classifier_path.display());
    let classifier = TractClassifier::new(classifier_path, settings.classifier_input)?
        .with_healthy_index(settings.healthy_index);

    Ok(ModelAdapters {
        detector: Arc::new(detector),
        classifier: Arc::new(classifier),
    })
}

#[cfg(not(feature = "backend-tract"))]
fn load_tract(_settings: &ModelSettings) -> Result<ModelAdapters> {
    Err(anyhow!("tract backend is not compiled in"))
}

/// Load adapters and assemble the pipeline for a service configuration.
pub fn build_pipeline(cfg: &LeafHealthConfig) -> Result<LeafHealthPipeline> {
    let adapters = load_adapters(&cfg.models)?;
    LeafHealthPipeline::new(adapters.detector, adapters.classifier, cfg.pipeline)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backend_names() {
        assert_eq!("stub".parse::<BackendKind>().unwrap(), BackendKind::Stub);
        assert_eq!(" Tract ".parse::<BackendKind>().unwrap(), BackendKind::Tract);
        assert!("torch".parse::<BackendKind>().is_err());
    }

    #[test]
    fn stub_backend_builds_a_pipeline() {
        let pipeline = build_pipeline(&LeafHealthConfig::default()).unwrap();
        assert_eq!(pipeline.detector_name(), "stub");
        assert_eq!(pipeline.classifier_name(), "stub");
    }

    #[cfg(not(feature = "backend-tract"))]
    #[test]
    fn tract_backend_unavailable_without_feature() {
        let settings = ModelSettings {
            backend: "tract".to_string(),
            ..ModelSettings::default()
        };
        let err = load_adapters(&settings).err().unwrap();
        assert!(err.to_string().contains("not compiled in"));
    }
}
