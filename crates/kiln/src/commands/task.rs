//! Single task commands.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use kiln_pipeline::{Category, LogEvents, Pipeline};

use crate::commands::project_root;
use crate::config::load_config;

fn pipeline(config_path: &Path) -> Result<Pipeline> {
    let file_config = load_config(config_path)?;
    let config = file_config.pipeline(project_root(config_path));
    Ok(Pipeline::new(config, Arc::new(LogEvents)))
}

/// Run the clean command.
pub async fn clean(config_path: &Path) -> Result<()> {
    let pipeline = pipeline(config_path)?;
    pipeline.clean().await?;

    tracing::info!(
        "Removed {}",
        pipeline.config().paths.dist_dir().display()
    );

    Ok(())
}

/// Run one transform task.
pub async fn run(config_path: &Path, category: Category) -> Result<()> {
    let report = pipeline(config_path)?.run(category).await?;

    if report.failed > 0 {
        tracing::warn!("{} {} file(s) failed", report.failed, category);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn runs_one_task() {
        let temp = tempdir().unwrap();
        let fonts = temp.path().join("src/assets/fonts");
        fs::create_dir_all(&fonts).unwrap();
        fs::write(fonts.join("mono.woff2"), [0u8, 1, 2]).unwrap();
        fs::create_dir_all(temp.path().join("src/assets/js")).unwrap();
        fs::write(temp.path().join("src/assets/js/main.js"), "var a = 1;").unwrap();

        run(&temp.path().join("kiln.toml"), Category::Fonts)
            .await
            .unwrap();

        let dist = temp.path().join("dist");
        assert_eq!(
            fs::read(dist.join("assets/fonts/mono.woff2")).unwrap(),
            vec![0u8, 1, 2]
        );
        assert!(!dist.join("assets/js/main.js").exists());
    }

    #[tokio::test]
    async fn clean_removes_output() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("dist/assets")).unwrap();
        fs::write(temp.path().join("dist/index.html"), "old").unwrap();

        clean(&temp.path().join("kiln.toml")).await.unwrap();

        assert!(!temp.path().join("dist").exists());
    }
}
