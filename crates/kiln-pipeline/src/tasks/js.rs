//! JS task: resolve `//=` includes into one script per entry, then minify.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::events::BuildEvents;
use crate::minify::minify_js;
use crate::paths::Category;
use crate::tasks::{run_files, sources, write_output, Guard, SourceFile, TaskError, TaskReport};
use crate::PipelineConfig;

pub const ERROR_TITLE: &str = "JS Error";

/// `//= path/to/file.js`, optionally indented and quoted.
static INCLUDE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(\s*)//=\s*["']?([^"'\s]+)["']?\s*$"#).expect("Invalid include regex")
});

/// Bundle every entry script into `name.js` and `name<suffix>.js`.
pub fn run(config: &PipelineConfig, events: &dyn BuildEvents) -> Result<TaskReport, TaskError> {
    let outputs = |file: &SourceFile| {
        vec![
            file.output_with("", "js"),
            file.output_with(&config.min_suffix, "js"),
        ]
    };
    let guard = Guard {
        title: ERROR_TITLE,
        outputs: &outputs,
    };

    let files = sources(Category::Js, config)?;
    run_files(Category::Js, files, events, Some(guard), |file| {
        let script_error = |message: String| TaskError::Script {
            path: file.path.clone(),
            message,
        };

        let bundled = resolve_includes(&file.path, &mut Vec::new()).map_err(script_error)?;
        write_output(&file.output_with("", "js"), &bundled)?;

        let minified = minify_js(&bundled).map_err(script_error)?;
        write_output(&file.output_with(&config.min_suffix, "js"), minified)
    })
}

/// Inline `//=` directives recursively, relative to the including file.
///
/// `stack` holds the files currently being expanded.
pub fn resolve_includes(path: &Path, stack: &mut Vec<PathBuf>) -> Result<String, String> {
    let canonical = path
        .canonicalize()
        .map_err(|e| format!("Cannot include {}: {}", path.display(), e))?;
    if stack.contains(&canonical) {
        return Err(format!("Include cycle through {}", path.display()));
    }

    let source = fs::read_to_string(path)
        .map_err(|e| format!("Cannot read {}: {}", path.display(), e))?;
    let dir = path.parent().unwrap_or(Path::new(""));

    stack.push(canonical);
    let mut out = String::with_capacity(source.len());

    for line in source.split_inclusive('\n') {
        let content = line.trim_end_matches(['\r', '\n']);
        let Some(caps) = INCLUDE_RE.captures(content) else {
            out.push_str(line);
            continue;
        };

        let indent = &caps[1];
        let included = resolve_includes(&dir.join(&caps[2]), stack)?;
        for included_line in included.split_inclusive('\n') {
            out.push_str(indent);
            out.push_str(included_line);
        }
        if !included.ends_with('\n') && line.ends_with('\n') {
            out.push('\n');
        }
    }

    stack.pop();
    Ok(out)
}
