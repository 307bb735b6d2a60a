//! CSS task: compile SCSS entries, prefix, format and minify.

use crate::events::BuildEvents;
use crate::minify::{browser_targets, process_css};
use crate::paths::Category;
use crate::tasks::{run_files, sources, write_output, Guard, SourceFile, TaskError, TaskReport};
use crate::PipelineConfig;

pub const ERROR_TITLE: &str = "SCSS Error";

/// Compile every SCSS entry file into `name.css` and `name<suffix>.css`.
///
/// Files whose name starts with `_` are partials and only reachable through
/// `@use`/`@import`.
pub fn run(config: &PipelineConfig, events: &dyn BuildEvents) -> Result<TaskReport, TaskError> {
    let scss_base = config
        .root
        .join(&config.paths.entry(Category::Css).source_base);
    let targets = browser_targets(&config.browsers);

    let outputs = |file: &SourceFile| {
        vec![
            file.output_with("", "css"),
            file.output_with(&config.min_suffix, "css"),
        ]
    };
    let guard = Guard {
        title: ERROR_TITLE,
        outputs: &outputs,
    };

    let files = sources(Category::Css, config)?
        .into_iter()
        .filter(|file| !is_partial(file))
        .collect();

    run_files(Category::Css, files, events, Some(guard), |file| {
        let style_error = |message: String| TaskError::Style {
            path: file.path.clone(),
            message,
        };

        let targets = targets.clone().map_err(style_error)?;

        let options = grass::Options::default()
            .style(grass::OutputStyle::Expanded)
            .load_path(&scss_base);
        let css = grass::from_path(&file.path, &options).map_err(|e| style_error(e.to_string()))?;

        let filename = file.relative.to_string_lossy();
        let output = process_css(&css, &filename, targets).map_err(style_error)?;

        write_output(&file.output_with("", "css"), output.expanded)?;
        write_output(
            &file.output_with(&config.min_suffix, "css"),
            output.minified,
        )
    })
}

fn is_partial(file: &SourceFile) -> bool {
    file.relative
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('_'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::testing::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn writes_expanded_and_minified_css() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        write(root, "src/assets/scss/_vars.scss", "$accent: #ff0000;\n");
        write(
            root,
            "src/assets/scss/main.scss",
            "@use 'vars';\n\n/* heading */\n.title {\n  color: vars.$accent;\n  .icon { margin: 0 4px; }\n}\n",
        );

        let events = RecordingEvents::default();
        let report = run(&config(root), &events).unwrap();

        assert_eq!(report.written, 1);
        let css_dir = root.join("dist/assets/css");
        let expanded = fs::read_to_string(css_dir.join("main.css")).unwrap();
        let minified = fs::read_to_string(css_dir.join("main.min.css")).unwrap();

        assert!(expanded.contains(".title .icon"));
        assert!(!minified.contains("/*"));
        assert!(minified.len() <= expanded.len());
        assert!(!css_dir.join("_vars.css").exists());
        assert_eq!(events.reloads(), vec![Category::Css]);
    }

    #[test]
    fn syntax_error_notifies_and_removes_stale_output() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        write(root, "src/assets/scss/main.scss", ".a { color: red; }\n");

        let cfg = config(root);
        run(&cfg, &RecordingEvents::default()).unwrap();
        assert!(root.join("dist/assets/css/main.css").exists());

        write(root, "src/assets/scss/main.scss", ".a { color: red;\n");
        let events = RecordingEvents::default();
        let report = run(&cfg, &events).unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(events.titles(), vec![ERROR_TITLE.to_string()]);
        assert!(!root.join("dist/assets/css/main.css").exists());
        assert!(!root.join("dist/assets/css/main.min.css").exists());
        assert_eq!(events.reloads(), vec![Category::Css]);
    }

    #[test]
    fn one_broken_entry_does_not_stop_the_others() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        write(root, "src/assets/scss/bad.scss", ".a { color: $missing; }\n");
        write(root, "src/assets/scss/good.scss", ".b { color: blue; }\n");

        let events = RecordingEvents::default();
        let report = run(&config(root), &events).unwrap();

        assert_eq!((report.written, report.failed), (1, 1));
        assert!(root.join("dist/assets/css/good.min.css").exists());
    }

    #[test]
    fn honours_custom_min_suffix() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        write(root, "src/assets/scss/site.scss", ".a { color: red; }\n");

        let mut cfg = config(root);
        cfg.min_suffix = "-min".to_string();
        run(&cfg, &RecordingEvents::default()).unwrap();

        assert!(root.join("dist/assets/css/site-min.css").exists());
    }
}
