//! Fonts task: copy font files unchanged.

use std::fs;

use crate::events::BuildEvents;
use crate::paths::Category;
use crate::tasks::{run_files, sources, TaskError, TaskReport};
use crate::PipelineConfig;

/// Copy every matched font. The first failure aborts the run.
pub fn run(config: &PipelineConfig, events: &dyn BuildEvents) -> Result<TaskReport, TaskError> {
    let files = sources(Category::Fonts, config)?;

    run_files(Category::Fonts, files, events, None, |file| {
        let target = file.output();
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| TaskError::io(parent, e))?;
        }
        fs::copy(&file.path, &target).map_err(|e| TaskError::io(&file.path, e))?;
        Ok(())
    })
}
