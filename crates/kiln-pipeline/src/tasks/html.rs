//! HTML task: compose pages from layouts, partials and data.

use std::fs;

use kiln_templates::{TemplateEngine, TemplateRoots};

use crate::events::BuildEvents;
use crate::paths::Category;
use crate::tasks::{run_files, sources, write_output, Guard, SourceFile, TaskError, TaskReport};
use crate::PipelineConfig;

pub const ERROR_TITLE: &str = "HTML Error";

/// Render every root-level page.
///
/// Layouts, partials and data are re-read on every run.
pub fn run(config: &PipelineConfig, events: &dyn BuildEvents) -> Result<TaskReport, TaskError> {
    let roots = TemplateRoots::new(config.root.join(config.paths.src_dir()));
    let engine = TemplateEngine::load(&roots);

    let outputs = |file: &SourceFile| vec![file.output()];
    let guard = Guard {
        title: ERROR_TITLE,
        outputs: &outputs,
    };

    let files = sources(Category::Html, config)?;
    run_files(Category::Html, files, events, Some(guard), |file| {
        let engine = engine.as_ref().map_err(|e| TaskError::Html {
            path: file.path.clone(),
            message: e.to_string(),
        })?;

        let source = fs::read_to_string(&file.path).map_err(|e| TaskError::io(&file.path, e))?;
        let html = engine
            .render_page(&file.relative, &source)
            .map_err(|e| TaskError::Html {
                path: file.path.clone(),
                message: e.to_string(),
            })?;

        write_output(&file.output(), html)
    })
}
