//! Transform tasks, one per asset category, plus the clean task.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;

use crate::events::{BuildEvents, Notification};
use crate::paths::{Category, PathEntry};
use crate::PipelineConfig;

pub mod clean;
pub mod css;
pub mod fonts;
pub mod html;
pub mod images;
pub mod js;

/// Errors that can occur while running a task.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid glob {pattern}: {message}")]
    Glob { pattern: String, message: String },

    #[error("{path}: {message}")]
    Html { path: PathBuf, message: String },

    #[error("{path}: {message}")]
    Style { path: PathBuf, message: String },

    #[error("{path}: {message}")]
    Script { path: PathBuf, message: String },

    #[error("Failed to optimize {path}: {message}")]
    Image { path: PathBuf, message: String },

    #[error("Task {0} did not finish: {1}")]
    Join(String, String),
}

impl TaskError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        TaskError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Summary of one task run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    pub category: Category,

    /// Source files transformed successfully
    pub written: usize,

    /// Source files that failed and were reported
    pub failed: usize,

    /// Wall time in milliseconds
    pub duration_ms: u64,
}

/// A matched source file and where its outputs go.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path to read
    pub path: PathBuf,

    /// Path relative to the category's source base
    pub relative: PathBuf,

    /// Category output directory
    pub output_dir: PathBuf,
}

impl SourceFile {
    fn new(path: PathBuf, root: &Path, entry: &PathEntry) -> Self {
        let base = root.join(&entry.source_base);
        let relative = path
            .strip_prefix(&base)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| PathBuf::from(path.file_name().unwrap_or_default()));

        Self {
            path,
            relative,
            output_dir: root.join(&entry.output_dir),
        }
    }

    /// Output path mirroring the source path.
    pub fn output(&self) -> PathBuf {
        self.output_dir.join(&self.relative)
    }

    /// Output path mirroring the source path, with `suffix` appended to the
    /// file stem and the extension replaced by `ext`.
    pub fn output_with(&self, suffix: &str, ext: &str) -> PathBuf {
        let stem = self
            .relative
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = format!("{}{}.{}", stem, suffix, ext);
        self.output_dir.join(&self.relative).with_file_name(name)
    }
}

/// Run one transform task to completion.
pub fn run_task(
    category: Category,
    config: &PipelineConfig,
    events: &dyn BuildEvents,
) -> Result<TaskReport, TaskError> {
    tracing::debug!(task = %category, "Starting");

    let report = match category {
        Category::Html => html::run(config, events),
        Category::Css => css::run(config, events),
        Category::Js => js::run(config, events),
        Category::Images => images::run(config, events),
        Category::Fonts => fonts::run(config, events),
    }?;

    tracing::info!(
        task = %category,
        written = report.written,
        failed = report.failed,
        ms = report.duration_ms,
        "Finished"
    );

    Ok(report)
}

/// Source files matched by a category's glob.
pub(crate) fn sources(
    category: Category,
    config: &PipelineConfig,
) -> Result<Vec<SourceFile>, TaskError> {
    let entry = config.paths.entry(category);
    let files = entry
        .discover(&config.root)?
        .into_iter()
        .map(|path| SourceFile::new(path, &config.root, entry))
        .collect();
    Ok(files)
}

/// How a guarded task reports and cleans up after a failing file.
pub(crate) struct Guard<'a> {
    /// Notification title
    pub title: &'static str,

    /// Outputs a file owns; removed when it fails so no stale copy survives
    pub outputs: &'a (dyn Fn(&SourceFile) -> Vec<PathBuf> + Sync),
}

/// Process every matched file in parallel.
///
/// With a guard, a failing file is reported, its outputs are removed, and the
/// others still run. Without one, the first failure aborts the task and no
/// reload is sent.
pub(crate) fn run_files<F>(
    category: Category,
    files: Vec<SourceFile>,
    events: &dyn BuildEvents,
    guard: Option<Guard<'_>>,
    process: F,
) -> Result<TaskReport, TaskError>
where
    F: Fn(&SourceFile) -> Result<(), TaskError> + Sync,
{
    let start = Instant::now();
    let mut written = 0;
    let mut failed = 0;

    match guard {
        Some(guard) => {
            let results: Vec<(&SourceFile, Result<(), TaskError>)> =
                files.par_iter().map(|file| (file, process(file))).collect();

            for (file, result) in results {
                match result {
                    Ok(()) => written += 1,
                    Err(err) => {
                        failed += 1;
                        events.notify(&Notification::new(guard.title, err.to_string()));
                        for stale in (guard.outputs)(file) {
                            remove_stale(&stale);
                        }
                    }
                }
            }
        }
        None => {
            files.par_iter().try_for_each(|file| process(file))?;
            written = files.len();
        }
    }

    events.reload(category);

    Ok(TaskReport {
        category,
        written,
        failed,
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

/// Write `contents` to `path`, creating parent directories.
pub(crate) fn write_output(path: &Path, contents: impl AsRef<[u8]>) -> Result<(), TaskError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| TaskError::io(parent, e))?;
    }
    fs::write(path, contents).map_err(|e| TaskError::io(path, e))
}

fn remove_stale(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => tracing::debug!("Removed stale {}", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove stale {}: {}", path.display(), e),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Records everything tasks report.
    #[derive(Default)]
    pub struct RecordingEvents {
        pub reloads: Mutex<Vec<Category>>,
        pub notifications: Mutex<Vec<Notification>>,
    }

    impl RecordingEvents {
        pub fn titles(&self) -> Vec<String> {
            self.notifications
                .lock()
                .unwrap()
                .iter()
                .map(|n| n.title.clone())
                .collect()
        }

        pub fn reloads(&self) -> Vec<Category> {
            self.reloads.lock().unwrap().clone()
        }
    }

    impl BuildEvents for RecordingEvents {
        fn reload(&self, category: Category) {
            self.reloads.lock().unwrap().push(category);
        }

        fn notify(&self, notification: &Notification) {
            self.notifications.lock().unwrap().push(notification.clone());
        }
    }

    /// Config rooted at a temporary project directory.
    pub fn config(root: &Path) -> PipelineConfig {
        PipelineConfig {
            root: root.to_path_buf(),
            ..PipelineConfig::default()
        }
    }

    pub fn write(root: &Path, relative: &str, contents: impl AsRef<[u8]>) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn names_minified_sibling() {
        let file = SourceFile {
            path: PathBuf::from("src/assets/scss/main.scss"),
            relative: PathBuf::from("main.scss"),
            output_dir: PathBuf::from("dist/assets/css"),
        };

        assert_eq!(
            file.output_with(".min", "css"),
            PathBuf::from("dist/assets/css/main.min.css")
        );
        assert_eq!(
            file.output_with("", "css"),
            PathBuf::from("dist/assets/css/main.css")
        );
    }

    #[test]
    fn every_task_with_no_sources_is_a_quiet_no_op() {
        let temp = tempdir().unwrap();
        let config = config(temp.path());
        let events = RecordingEvents::default();

        for category in Category::ALL {
            let report = run_task(category, &config, &events).unwrap();
            assert_eq!(report.written, 0);
            assert_eq!(report.failed, 0);
        }

        assert!(!temp.path().join("dist").exists());
        assert!(events.titles().is_empty());
        assert_eq!(events.reloads(), Category::ALL.to_vec());
    }
}
