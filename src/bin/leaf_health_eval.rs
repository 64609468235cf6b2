//! leaf_health_eval - score one image from the command line
//!
//! Prints the same JSON document `POST /predict` answers with.

use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;

use leaf_health::{build_pipeline, IncidenceThresholds, LeafHealthConfig, PredictResponse};

#[derive(Parser, Debug)]
#[command(
    name = "leaf_health_eval",
    about = "Detect leaves in an image and score plant health"
)]
struct Args {
    /// Image to evaluate (JPEG or PNG)
    image: PathBuf,

    /// JSON configuration file (defaults to LEAF_HEALTH_CONFIG / built-ins)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Model backend (stub|tract)
    #[arg(long, env = "LEAF_HEALTH_BACKEND")]
    backend: Option<String>,

    /// Minimum box width and height in pixels
    #[arg(long)]
    min_box_size: Option<f32>,

    /// Minimum classifier confidence for a label to count
    #[arg(long)]
    min_class_conf: Option<f32>,

    /// Disease incidence at which status becomes Moderate
    #[arg(long)]
    moderate: Option<f64>,

    /// Disease incidence at which status becomes Unhealthy
    #[arg(long)]
    unhealthy: Option<f64>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => LeafHealthConfig::load_from(path)?,
        None => LeafHealthConfig::load()?,
    };
    if let Some(backend) = &args.backend {
        config.models.backend = backend.trim().to_lowercase();
    }
    if let Some(size) = args.min_box_size {
        config.pipeline.min_box_size = size;
    }
    if let Some(conf) = args.min_class_conf {
        config.pipeline.min_class_conf = conf;
    }
    if args.moderate.is_some() || args.unhealthy.is_some() {
        let current = config.pipeline.thresholds;
        config.pipeline.thresholds = IncidenceThresholds::new(
            args.moderate.unwrap_or(current.moderate()),
            args.unhealthy.unwrap_or(current.unhealthy()),
        )?;
    }
    config.validate()?;

    let pipeline = build_pipeline(&config)?;
    let bytes = std::fs::read(&args.image)
        .map_err(|e| anyhow!("failed to read {}: {}", args.image.display(), e))?;
    let outcome = pipeline
        .evaluate_bytes(&bytes)
        .map_err(|e| anyhow!("{} ({})", e, e.code()))?;

    let response = PredictResponse::from(&outcome);
    let json = if args.pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        serde_json::to_string(&response)?
    };
    println!("{json}");
    Ok(())
}
