//! Lane Pipeline - Main Entry Point
//!
//! Usage: `lane-pipeline [CONFIG_PATH]`

use std::path::PathBuf;

use anyhow::Context;
use lane_pipeline::{init_logging, LanePipeline, PipelineConfig};
use tracing::info;

fn main() -> anyhow::Result<()> {
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = PipelineConfig::load(config_path.as_deref())
        .context("failed to load pipeline configuration")?;

    init_logging(&config.log_level);

    info!("=== Lane Pipeline v{} ===", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &config_path {
        info!("Configuration loaded from {}", path.display());
    }

    let input_dir = config.input_dir.clone();
    let mut pipeline = LanePipeline::new(config)?;
    let summary = pipeline
        .run()
        .with_context(|| format!("lane pipeline failed on {}", input_dir.display()))?;

    info!(
        "Done: {} frames ({} fresh, {} held, {} without lane), {} skipped",
        summary.processed, summary.fresh, summary.held, summary.no_lane, summary.skipped
    );
    Ok(())
}
