//! Full build command.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use kiln_pipeline::{LogEvents, Pipeline};

use crate::commands::project_root;
use crate::config::load_config;

/// Run the build command.
pub async fn run(config_path: &Path) -> Result<()> {
    tracing::info!("Building...");

    let file_config = load_config(config_path)?;
    let config = file_config.pipeline(project_root(config_path));
    let output = config.root.join(config.paths.dist_dir());

    let report = Pipeline::new(config, Arc::new(LogEvents)).build().await?;

    if report.failed() > 0 {
        tracing::warn!("{} file(s) failed to build", report.failed());
    }

    tracing::info!(
        "Built {} files in {}ms",
        report.written(),
        report.duration_ms
    );
    tracing::info!("Output: {}", output.display());

    Ok(())
}
