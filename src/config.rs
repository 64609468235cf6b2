use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::pipeline::{
    IncidenceThresholds, PipelineConfig, DEFAULT_MIN_BOX_SIZE, DEFAULT_MIN_CLASS_CONF,
    DEFAULT_MODERATE_INCIDENCE, DEFAULT_UNHEALTHY_INCIDENCE,
};

const DEFAULT_API_ADDR: &str = "127.0.0.1:8000";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;
const DEFAULT_MAX_IN_FLIGHT: usize = 4;
const DEFAULT_BACKEND: &str = "stub";
const DEFAULT_DETECTOR_INPUT: u32 = 640;
const DEFAULT_CLASSIFIER_INPUT: u32 = 224;
const DEFAULT_DETECTOR_CONFIDENCE: f32 = 0.25;
const DEFAULT_NMS_IOU: f32 = 0.45;
const DEFAULT_HEALTHY_INDEX: usize = 1;

#[derive(Debug, Deserialize, Default)]
struct LeafHealthConfigFile {
    api: Option<ApiConfigFile>,
    models: Option<ModelsConfigFile>,
    pipeline: Option<PipelineConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ApiConfigFile {
    addr: Option<String>,
    max_upload_bytes: Option<usize>,
    max_in_flight: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct ModelsConfigFile {
    backend: Option<String>,
    detector_path: Option<PathBuf>,
    classifier_path: Option<PathBuf>,
    detector_input: Option<u32>,
    classifier_input: Option<u32>,
    detector_confidence: Option<f32>,
    nms_iou: Option<f32>,
    healthy_index: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct PipelineConfigFile {
    min_box_size: Option<f32>,
    min_class_conf: Option<f32>,
    incidence: Option<IncidenceConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct IncidenceConfigFile {
    moderate: Option<f64>,
    unhealthy: Option<f64>,
}

/// Service configuration: JSON file (`LEAF_HEALTH_CONFIG`), then environment
/// overrides, then validation.
#[derive(Debug, Clone)]
pub struct LeafHealthConfig {
    pub api_addr: String,
    pub max_upload_bytes: usize,
    /// Concurrent requests the API serves before queueing.
    pub max_in_flight: usize,
    pub models: ModelSettings,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    /// `stub` or `tract`.
    pub backend: String,
    pub detector_path: Option<PathBuf>,
    pub classifier_path: Option<PathBuf>,
    /// Square detector input edge, in pixels.
    pub detector_input: u32,
    /// Square classifier input edge, in pixels.
    pub classifier_input: u32,
    pub detector_confidence: f32,
    pub nms_iou: f32,
    /// Logit position of the healthy class in the classifier output.
    pub healthy_index: usize,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            backend: DEFAULT_BACKEND.to_string(),
            detector_path: None,
            classifier_path: None,
            detector_input: DEFAULT_DETECTOR_INPUT,
            classifier_input: DEFAULT_CLASSIFIER_INPUT,
            detector_confidence: DEFAULT_DETECTOR_CONFIDENCE,
            nms_iou: DEFAULT_NMS_IOU,
            healthy_index: DEFAULT_HEALTHY_INDEX,
        }
    }
}

impl Default for LeafHealthConfig {
    fn default() -> Self {
        Self {
            api_addr: DEFAULT_API_ADDR.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            models: ModelSettings::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl LeafHealthConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("LEAF_HEALTH_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from an explicit file path, still honouring environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut cfg = Self::from_file(read_config_file(path)?)?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: LeafHealthConfigFile) -> Result<Self> {
        let api = file.api.unwrap_or_default();
        let models = file.models.unwrap_or_default();
        let pipeline = file.pipeline.unwrap_or_default();
        let incidence = pipeline.incidence.unwrap_or_default();

        let thresholds = IncidenceThresholds::new(
            incidence.moderate.unwrap_or(DEFAULT_MODERATE_INCIDENCE),
            incidence.unhealthy.unwrap_or(DEFAULT_UNHEALTHY_INCIDENCE),
        )?;

        Ok(Self {
            api_addr: api.addr.unwrap_or_else(|| DEFAULT_API_ADDR.to_string()),
            max_upload_bytes: api.max_upload_bytes.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            max_in_flight: api.max_in_flight.unwrap_or(DEFAULT_MAX_IN_FLIGHT),
            models: ModelSettings {
                backend: models
                    .backend
                    .map(|backend| backend.trim().to_lowercase())
                    .unwrap_or_else(|| DEFAULT_BACKEND.to_string()),
                detector_path: models.detector_path,
                classifier_path: models.classifier_path,
                detector_input: models.detector_input.unwrap_or(DEFAULT_DETECTOR_INPUT),
                classifier_input: models.classifier_input.unwrap_or(DEFAULT_CLASSIFIER_INPUT),
                detector_confidence: models
                    .detector_confidence
                    .unwrap_or(DEFAULT_DETECTOR_CONFIDENCE),
                nms_iou: models.nms_iou.unwrap_or(DEFAULT_NMS_IOU),
                healthy_index: models.healthy_index.unwrap_or(DEFAULT_HEALTHY_INDEX),
            },
            pipeline: PipelineConfig {
                min_box_size: pipeline.min_box_size.unwrap_or(DEFAULT_MIN_BOX_SIZE),
                min_class_conf: pipeline.min_class_conf.unwrap_or(DEFAULT_MIN_CLASS_CONF),
                thresholds,
            },
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(addr) = std::env::var("LEAF_HEALTH_API_ADDR") {
            if !addr.trim().is_empty() {
                self.api_addr = addr;
            }
        }
        if let Some(bytes) = parse_env::<usize>("LEAF_HEALTH_MAX_UPLOAD_BYTES")? {
            self.max_upload_bytes = bytes;
        }
        if let Some(workers) = parse_env::<usize>("LEAF_HEALTH_MAX_IN_FLIGHT")? {
            self.max_in_flight = workers;
        }
        if let Ok(backend) = std::env::var("LEAF_HEALTH_BACKEND") {
            if !backend.trim().is_empty() {
                self.models.backend = backend.trim().to_lowercase();
            }
        }
        if let Ok(path) = std::env::var("LEAF_HEALTH_DETECTOR_MODEL") {
            if !path.trim().is_empty() {
                self.models.detector_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(path) = std::env::var("LEAF_HEALTH_CLASSIFIER_MODEL") {
            if !path.trim().is_empty() {
                self.models.classifier_path = Some(PathBuf::from(path));
            }
        }
        if let Some(size) = parse_env::<f32>("LEAF_HEALTH_MIN_BOX_SIZE")? {
            self.pipeline.min_box_size = size;
        }
        if let Some(conf) = parse_env::<f32>("LEAF_HEALTH_MIN_CLASS_CONF")? {
            self.pipeline.min_class_conf = conf;
        }
        let moderate = parse_env::<f64>("LEAF_HEALTH_INCIDENCE_MODERATE")?;
        let unhealthy = parse_env::<f64>("LEAF_HEALTH_INCIDENCE_UNHEALTHY")?;
        if moderate.is_some() || unhealthy.is_some() {
            let current = self.pipeline.thresholds;
            self.pipeline.thresholds = IncidenceThresholds::new(
                moderate.unwrap_or(current.moderate()),
                unhealthy.unwrap_or(current.unhealthy()),
            )?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.pipeline.validate()?;
        if self.max_upload_bytes == 0 {
            return Err(anyhow!("max_upload_bytes must be greater than zero"));
        }
        if self.max_in_flight == 0 {
            return Err(anyhow!("max_in_flight must be greater than zero"));
        }
        let models = &self.models;
        if models.detector_input == 0 || models.classifier_input == 0 {
            return Err(anyhow!("model input sizes must be greater than zero"));
        }
        if !(0.0..=1.0).contains(&models.detector_confidence) {
            return Err(anyhow!("detector_confidence must lie in [0, 1]"));
        }
        if !(0.0..=1.0).contains(&models.nms_iou) {
            return Err(anyhow!("nms_iou must lie in [0, 1]"));
        }
        if models.healthy_index > 1 {
            return Err(anyhow!("healthy_index must be 0 or 1"));
        }
        match models.backend.as_str() {
            "stub" => {}
            "tract" => {
                if models.detector_path.is_none() || models.classifier_path.is_none() {
                    return Err(anyhow!(
                        "tract backend requires detector_path and classifier_path \
                         (LEAF_HEALTH_DETECTOR_MODEL / LEAF_HEALTH_CLASSIFIER_MODEL)"
                    ));
                }
            }
            other => return Err(anyhow!("unknown model backend '{}'", other)),
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<LeafHealthConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("{} has an invalid value '{}'", key, value)),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = LeafHealthConfig::from_file(LeafHealthConfigFile::default()).unwrap();
        assert_eq!(cfg.api_addr, DEFAULT_API_ADDR);
        assert_eq!(cfg.models.backend, "stub");
        assert_eq!(cfg.pipeline, PipelineConfig::default());
        cfg.validate().unwrap();
    }

    #[test]
    fn zero_in_flight_limit_is_rejected() {
        let mut cfg = LeafHealthConfig::default();
        cfg.max_in_flight = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn inverted_thresholds_in_file_are_rejected() {
        let file: LeafHealthConfigFile = serde_json::from_str(
            r#"{ "pipeline": { "incidence": { "moderate": 0.5, "unhealthy": 0.2 } } }"#,
        )
        .unwrap();
        assert!(LeafHealthConfig::from_file(file).is_err());
    }

    #[test]
    fn tract_backend_needs_model_paths() {
        let mut cfg = LeafHealthConfig::default();
        cfg.models.backend = "tract".to_string();
        assert!(cfg.validate().is_err());

        cfg.models.detector_path = Some(PathBuf::from("detector.onnx"));
        cfg.models.classifier_path = Some(PathBuf::from("classifier.onnx"));
        cfg.validate().unwrap();

        cfg.models.backend = "torch".to_string();
        assert!(cfg.validate().is_err());
    }
}
