//! Asset pipeline for kiln.
//!
//! Compiles pages, stylesheets, scripts, images and fonts from a source tree
//! into an output tree. Each asset category is an independent task; a build
//! cleans the output tree and then runs every task concurrently.

use std::path::PathBuf;

pub mod events;
pub mod minify;
pub mod paths;
pub mod pipeline;
pub mod tasks;

pub use events::{BuildEvents, LogEvents, Notification};
pub use paths::{compile_glob, relative_str, Category, PathEntry, PathTable};
pub use pipeline::{BuildReport, Pipeline};
pub use tasks::{run_task, TaskError, TaskReport};

/// Everything a task needs to know about the project.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Project root; every path in `paths` is relative to it
    pub root: PathBuf,

    /// Source globs and output directories per category
    pub paths: PathTable,

    /// Inserted between stem and extension of minified CSS/JS siblings
    pub min_suffix: String,

    /// Browserslist queries driving vendor prefixes
    pub browsers: Vec<String>,

    /// JPEG re-encoding quality (1-100)
    pub jpeg_quality: u8,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            paths: PathTable::default(),
            min_suffix: ".min".to_string(),
            browsers: vec!["defaults".to_string()],
            jpeg_quality: 80,
        }
    }
}
