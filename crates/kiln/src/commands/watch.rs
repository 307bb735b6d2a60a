//! Watch command: build, serve and rebuild on change.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use kiln_pipeline::Pipeline;
use kiln_server::{DevServer, ReloadHub, WatchRegistrar};

use crate::commands::project_root;
use crate::config::load_config;

/// Run the watch command.
pub async fn run(config_path: &Path, port: Option<u16>, open: bool) -> Result<()> {
    let file_config = load_config(config_path)?;
    let root = project_root(config_path);

    let hub = ReloadHub::new();
    let pipeline = Pipeline::new(file_config.pipeline(&root), Arc::new(hub.clone()));

    // Keep going so the developer can fix the source
    match pipeline.build().await {
        Ok(report) => tracing::info!(
            "Built {} files in {}ms",
            report.written(),
            report.duration_ms
        ),
        Err(e) => tracing::error!("Initial build failed: {}", e),
    }

    let mut server_config = file_config.server(&root);
    if let Some(port) = port {
        server_config.port = port;
    }
    server_config.open = server_config.open && open;

    let registrar = WatchRegistrar::new(pipeline, file_config.debounce())?;
    let server = DevServer::new(server_config, hub).bind().await?;

    tokio::try_join!(server.serve(), registrar.run())?;

    Ok(())
}
