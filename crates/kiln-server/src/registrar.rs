//! Watch registrar: re-run the right task when a source file changes.

use std::collections::HashMap;
use std::time::Duration;

use globset::GlobMatcher;
use kiln_pipeline::{relative_str, Category, Pipeline};
use tokio::sync::mpsc;

use crate::server::ServerError;
use crate::watcher::FileWatcher;

/// A category's watch glob, compiled.
#[derive(Debug, Clone)]
pub struct WatchBinding {
    pub category: Category,
    pub matcher: GlobMatcher,
}

/// Binds every category's watch glob to its transform task.
///
/// Triggers for one category are coalesced over the debounce window and never
/// overlap: a trigger that arrives while the task runs schedules exactly one
/// follow-up run. Different categories run concurrently.
pub struct WatchRegistrar {
    pipeline: Pipeline,
    bindings: Vec<WatchBinding>,
    debounce: Duration,
}

impl WatchRegistrar {
    /// Compile the watch globs of every category in the pipeline's path table.
    pub fn new(pipeline: Pipeline, debounce: Duration) -> Result<Self, ServerError> {
        let bindings = pipeline
            .config()
            .paths
            .entries()
            .iter()
            .map(|entry| {
                Ok(WatchBinding {
                    category: entry.category,
                    matcher: entry
                        .watch_matcher()
                        .map_err(|e| ServerError::WatchError(e.to_string()))?,
                })
            })
            .collect::<Result<Vec<_>, ServerError>>()?;

        Ok(Self {
            pipeline,
            bindings,
            debounce,
        })
    }

    pub fn bindings(&self) -> &[WatchBinding] {
        &self.bindings
    }

    /// Categories whose watch glob matches `rel_path` (relative to the project root).
    pub fn categories_for(&self, rel_path: &str) -> Vec<Category> {
        self.bindings
            .iter()
            .filter(|b| b.matcher.is_match(rel_path))
            .map(|b| b.category)
            .collect()
    }

    /// Watch the source tree until the process exits.
    pub async fn run(self) -> Result<(), ServerError> {
        let config = self.pipeline.config();
        let root = config
            .root
            .canonicalize()
            .unwrap_or_else(|_| config.root.clone());
        let src = root.join(config.paths.src_dir());

        let (watcher, mut rx) =
            FileWatcher::new(&[src.clone()]).map_err(|e| ServerError::WatchError(e.to_string()))?;

        let triggers: HashMap<Category, mpsc::Sender<()>> = Category::ALL
            .into_iter()
            .map(|category| (category, spawn_worker(self.pipeline.clone(), category, self.debounce)))
            .collect();

        tracing::info!("Watching {}", src.display());

        while let Some(event) = rx.recv().await {
            let Some(rel) = relative_str(&root, event.path()) else {
                tracing::debug!("Ignoring change outside {}", root.display());
                continue;
            };

            for category in self.categories_for(&rel) {
                tracing::debug!(task = %category, path = %rel, "Change detected");
                if let Some(tx) = triggers.get(&category) {
                    // A full slot means a run is already pending.
                    let _ = tx.try_send(());
                }
            }
        }

        // Keep watcher alive
        drop(watcher);

        Ok(())
    }
}

/// Serialized runner for one category.
fn spawn_worker(pipeline: Pipeline, category: Category, debounce: Duration) -> mpsc::Sender<()> {
    let (tx, mut rx) = mpsc::channel::<()>(1);

    tokio::spawn(async move {
        while rx.recv().await.is_some() {
            if !debounce.is_zero() {
                tokio::time::sleep(debounce).await;
                while rx.try_recv().is_ok() {}
            }

            if let Err(e) = pipeline.run(category).await {
                tracing::error!(task = %category, "{}", e);
            }
        }
    });

    tx
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_pipeline::{BuildEvents, LogEvents, Notification, PipelineConfig};
    use std::fs;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn pipeline(root: &Path) -> Pipeline {
        let config = PipelineConfig {
            root: root.to_path_buf(),
            ..PipelineConfig::default()
        };
        Pipeline::new(config, Arc::new(LogEvents))
    }

    /// Counts task runs; each run holds its blocking thread for `delay`.
    struct CountingEvents {
        runs: AtomicUsize,
        delay: Duration,
    }

    impl BuildEvents for CountingEvents {
        fn reload(&self, _category: Category) {
            std::thread::sleep(self.delay);
            self.runs.fetch_add(1, Ordering::SeqCst);
        }

        fn notify(&self, _notification: &Notification) {}
    }

    fn counting_pipeline(root: &Path, delay: Duration) -> (Pipeline, Arc<CountingEvents>) {
        let events = Arc::new(CountingEvents {
            runs: AtomicUsize::new(0),
            delay,
        });
        let config = PipelineConfig {
            root: root.to_path_buf(),
            ..PipelineConfig::default()
        };
        (Pipeline::new(config, events.clone()), events)
    }

    #[tokio::test]
    async fn burst_of_changes_runs_once() {
        let temp = tempdir().unwrap();
        let (pipeline, events) = counting_pipeline(temp.path(), Duration::ZERO);
        let tx = spawn_worker(pipeline, Category::Fonts, Duration::from_millis(150));

        for _ in 0..5 {
            let _ = tx.try_send(());
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tokio::time::sleep(Duration::from_millis(600)).await;

        assert_eq!(events.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn changes_during_a_run_schedule_one_follow_up() {
        let temp = tempdir().unwrap();
        let (pipeline, events) = counting_pipeline(temp.path(), Duration::from_millis(300));
        let tx = spawn_worker(pipeline, Category::Fonts, Duration::ZERO);

        let _ = tx.try_send(());
        tokio::time::sleep(Duration::from_millis(100)).await;
        for _ in 0..3 {
            let _ = tx.try_send(());
        }

        tokio::time::sleep(Duration::from_millis(1200)).await;

        assert_eq!(events.runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn binds_every_category() {
        let temp = tempdir().unwrap();
        let registrar = WatchRegistrar::new(pipeline(temp.path()), Duration::ZERO).unwrap();

        let categories: Vec<Category> = registrar.bindings().iter().map(|b| b.category).collect();
        assert_eq!(categories, Category::ALL.to_vec());
    }

    #[test]
    fn routes_changes_to_their_category() {
        let temp = tempdir().unwrap();
        let registrar = WatchRegistrar::new(pipeline(temp.path()), Duration::ZERO).unwrap();

        assert_eq!(
            registrar.categories_for("src/templates/partials/nav.html"),
            vec![Category::Html]
        );
        assert_eq!(
            registrar.categories_for("src/assets/scss/base/_reset.scss"),
            vec![Category::Css]
        );
        assert_eq!(
            registrar.categories_for("src/assets/js/lib/util.js"),
            vec![Category::Js]
        );
        assert_eq!(
            registrar.categories_for("src/assets/fonts/icons.svg"),
            vec![Category::Fonts]
        );
        assert!(registrar.categories_for("dist/index.html").is_empty());
        assert!(registrar.categories_for("src/assets/js/notes.md").is_empty());
    }

    #[tokio::test]
    async fn added_font_is_copied() {
        let temp = tempdir().unwrap();
        let fonts = temp.path().join("src/assets/fonts");
        fs::create_dir_all(&fonts).unwrap();

        let registrar =
            WatchRegistrar::new(pipeline(temp.path()), Duration::from_millis(50)).unwrap();
        let handle = tokio::spawn(registrar.run());

        // Give inotify time to set up
        tokio::time::sleep(Duration::from_millis(200)).await;

        let bytes: Vec<u8> = (0..64).collect();
        fs::write(fonts.join("display.woff2"), &bytes).unwrap();

        let copied = temp.path().join("dist/assets/fonts/display.woff2");
        let mut found = None;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if let Ok(contents) = fs::read(&copied) {
                if contents.len() == bytes.len() {
                    found = Some(contents);
                    break;
                }
            }
        }

        handle.abort();
        assert_eq!(found, Some(bytes));
    }
}
