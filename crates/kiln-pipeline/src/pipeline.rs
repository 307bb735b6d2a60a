//! Build orchestration.

use std::sync::Arc;
use std::time::Instant;

use crate::events::BuildEvents;
use crate::paths::Category;
use crate::tasks::{self, clean, TaskError, TaskReport};
use crate::PipelineConfig;

/// Result of a full build.
#[derive(Debug)]
pub struct BuildReport {
    /// One report per transform task, in [`Category::ALL`] order
    pub tasks: Vec<TaskReport>,

    /// Total build time in milliseconds
    pub duration_ms: u64,
}

impl BuildReport {
    /// Files that failed and were reported across all tasks.
    pub fn failed(&self) -> usize {
        self.tasks.iter().map(|t| t.failed).sum()
    }

    /// Files written across all tasks.
    pub fn written(&self) -> usize {
        self.tasks.iter().map(|t| t.written).sum()
    }
}

/// Runs tasks against one configuration and one events sink.
///
/// Cheap to clone; clones share the configuration and sink.
#[derive(Clone)]
pub struct Pipeline {
    config: Arc<PipelineConfig>,
    events: Arc<dyn BuildEvents>,
}

impl Pipeline {
    /// Create a pipeline reporting to `events`.
    pub fn new(config: PipelineConfig, events: Arc<dyn BuildEvents>) -> Self {
        Self {
            config: Arc::new(config),
            events,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Delete the output directory.
    pub async fn clean(&self) -> Result<(), TaskError> {
        let dist = self.config.root.join(self.config.paths.dist_dir());
        clean::run(&dist).await
    }

    /// Run one transform task on the blocking pool.
    pub async fn run(&self, category: Category) -> Result<TaskReport, TaskError> {
        let config = Arc::clone(&self.config);
        let events = Arc::clone(&self.events);

        tokio::task::spawn_blocking(move || tasks::run_task(category, &config, events.as_ref()))
            .await
            .map_err(|e| TaskError::Join(category.to_string(), e.to_string()))?
    }

    /// Clean, then run every transform task concurrently.
    ///
    /// Waits for all five tasks even when one fails; the first failure (in
    /// [`Category::ALL`] order) is returned.
    pub async fn build(&self) -> Result<BuildReport, TaskError> {
        let start = Instant::now();

        self.clean().await?;

        let (html, css, js, images, fonts) = tokio::join!(
            self.run(Category::Html),
            self.run(Category::Css),
            self.run(Category::Js),
            self.run(Category::Images),
            self.run(Category::Fonts),
        );

        let mut reports = Vec::with_capacity(Category::ALL.len());
        for result in [html, css, js, images, fonts] {
            reports.push(result?);
        }

        Ok(BuildReport {
            tasks: reports,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}
