//! Leaf Health
//!
//! Scores the health of a plant from a single photograph. A detector proposes
//! leaf boxes, each sufficiently large box is cropped and classified as
//! healthy or diseased, low-confidence labels are demoted to uncertain, and
//! the confident labels are aggregated into a disease incidence that maps to
//! `Healthy`, `Moderate` or `Unhealthy`.
//!
//! Degenerate photographs are outcomes, not errors: no proposal yields
//! `NoLeafDetected`, and proposals that are all too small yield
//! `LeafNotClear`.
//!
//! # Module Structure
//!
//! - `frame`: image decoding, cropping and tensor preparation
//! - `detect`: leaf detector seam, YOLO decoding, NMS, backends
//! - `classify`: crop classifier seam, softmax, backends
//! - `pipeline`: filter, gate, tally, policy, `Outcome` and its wire shape
//! - `backends`: backend selection from configuration
//! - `config`: file + environment configuration
//! - `api`: HTTP transport (`/predict`, `/health`)

pub mod api;
pub mod backends;
pub mod classify;
pub mod config;
pub mod detect;
pub mod error;
pub mod frame;
pub mod pipeline;

pub use backends::build_pipeline;
pub use classify::{LeafClassifier, LeafLabel, RawClassification};
pub use config::LeafHealthConfig;
pub use detect::{BoundingBox, Detection, LeafDetector};
pub use error::PipelineError;
pub use frame::{decode_image, LeafImage};
pub use pipeline::{
    HealthStatus, IncidenceThresholds, LeafClass, LeafHealthPipeline, Outcome, PipelineConfig,
    PredictResponse, Verdict,
};
