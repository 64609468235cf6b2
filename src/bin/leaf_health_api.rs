//! leaf_health_api - HTTP service for leaf-health scoring
//!
//! This daemon:
//! 1. Loads configuration (`LEAF_HEALTH_CONFIG` + environment overrides)
//! 2. Loads the detector and classifier once
//! 3. Serves `POST /predict` and `GET /health` until Ctrl-C

use anyhow::Result;
use std::sync::mpsc;

use leaf_health::{
    api::{ApiConfig, ApiServer},
    build_pipeline, LeafHealthConfig,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = LeafHealthConfig::load()?;
    let pipeline = build_pipeline(&config)?;
    log::info!(
        "models loaded: detector={} classifier={}",
        pipeline.detector_name(),
        pipeline.classifier_name()
    );
    pipeline.warm_up()?;
    let thresholds = pipeline.config().thresholds;
    log::info!(
        "pipeline: min_box_size={} min_class_conf={} incidence moderate>={} unhealthy>={}",
        pipeline.config().min_box_size,
        pipeline.config().min_class_conf,
        thresholds.moderate(),
        thresholds.unhealthy()
    );

    let api_config = ApiConfig {
        addr: config.api_addr.clone(),
        max_upload_bytes: config.max_upload_bytes,
        max_in_flight: config.max_in_flight,
    };
    let api_handle = ApiServer::new(api_config, pipeline).spawn()?;
    log::info!("predict api listening on {}", api_handle.addr);

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })?;

    log::info!("leaf_health_api waiting for shutdown signal (Ctrl-C)...");
    let _ = rx.recv();
    log::info!("shutdown signal received, stopping API server...");
    api_handle.stop()?;

    Ok(())
}
