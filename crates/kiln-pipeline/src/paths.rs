//! Path table: where each asset category is read from and written to.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use globset::{GlobBuilder, GlobMatcher};
use walkdir::WalkDir;

use crate::tasks::TaskError;

/// Asset categories handled by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Html,
    Css,
    Js,
    Images,
    Fonts,
}

impl Category {
    /// Every category, in a stable order.
    pub const ALL: [Category; 5] = [
        Category::Html,
        Category::Css,
        Category::Js,
        Category::Images,
        Category::Fonts,
    ];

    /// Task name used on the command line and in logs.
    pub fn name(self) -> &'static str {
        match self {
            Category::Html => "html",
            Category::Css => "css",
            Category::Js => "js",
            Category::Images => "images",
            Category::Fonts => "fonts",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| format!("unknown task: {s}"))
    }
}

/// One row of the path table. All paths are relative to the project root.
#[derive(Debug, Clone)]
pub struct PathEntry {
    pub category: Category,
    /// Files the task reads
    pub source_glob: String,
    /// Files whose changes re-trigger the task
    pub watch_glob: String,
    /// Directory source paths are made relative to before writing
    pub source_base: PathBuf,
    /// Directory outputs are written to
    pub output_dir: PathBuf,
}

impl PathEntry {
    /// Compiled matcher for `source_glob`.
    pub fn source_matcher(&self) -> Result<GlobMatcher, TaskError> {
        compile_glob(&self.source_glob)
    }

    /// Compiled matcher for `watch_glob`.
    pub fn watch_matcher(&self) -> Result<GlobMatcher, TaskError> {
        compile_glob(&self.watch_glob)
    }

    /// Find every file under `root` matching the source glob, sorted by path.
    pub fn discover(&self, root: &Path) -> Result<Vec<PathBuf>, TaskError> {
        let matcher = self.source_matcher()?;
        let base = root.join(&self.source_base);

        if !base.exists() {
            return Ok(Vec::new());
        }

        let files = WalkDir::new(&base)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                relative_str(root, e.path()).is_some_and(|rel| matcher.is_match(rel.as_str()))
            })
            .map(|e| e.into_path())
            .collect();

        Ok(files)
    }
}

/// The fixed five-row path table.
#[derive(Debug, Clone)]
pub struct PathTable {
    entries: [PathEntry; 5],
    src_dir: PathBuf,
    dist_dir: PathBuf,
}

impl PathTable {
    /// Standard layout for the given source and output roots.
    pub fn new(src_dir: impl Into<PathBuf>, dist_dir: impl Into<PathBuf>) -> Self {
        let src_dir = src_dir.into();
        let dist_dir = dist_dir.into();
        let src = glob_prefix(&src_dir);

        const IMAGES: &str = "{jpg,png,svg,gif,ico,webp,webmanifest,xml,json}";
        const FONTS: &str = "{eot,woff,woff2,ttf,svg}";

        let entry = |category, source_glob: String, watch_glob: String, base: &str, out: &str| {
            PathEntry {
                category,
                source_glob,
                watch_glob,
                source_base: src_dir.join(base),
                output_dir: dist_dir.join(out),
            }
        };

        let entries = [
            entry(
                Category::Html,
                format!("{src}*.html"),
                format!("{src}**/*.html"),
                "",
                "",
            ),
            entry(
                Category::Css,
                format!("{src}assets/scss/*.scss"),
                format!("{src}assets/scss/**/*.scss"),
                "assets/scss",
                "assets/css",
            ),
            entry(
                Category::Js,
                format!("{src}assets/js/*.js"),
                format!("{src}assets/js/**/*.js"),
                "assets/js",
                "assets/js",
            ),
            entry(
                Category::Images,
                format!("{src}assets/images/**/*.{IMAGES}"),
                format!("{src}assets/images/**/*.{IMAGES}"),
                "assets/images",
                "assets/images",
            ),
            entry(
                Category::Fonts,
                format!("{src}assets/fonts/**/*.{FONTS}"),
                format!("{src}assets/fonts/**/*.{FONTS}"),
                "assets/fonts",
                "assets/fonts",
            ),
        ];

        Self {
            entries,
            src_dir,
            dist_dir,
        }
    }

    /// The row for a category.
    pub fn entry(&self, category: Category) -> &PathEntry {
        // Rows are stored in declaration order.
        &self.entries[category as usize]
    }

    /// All rows, in [`Category::ALL`] order.
    pub fn entries(&self) -> &[PathEntry] {
        &self.entries
    }

    /// Source root, relative to the project root.
    pub fn src_dir(&self) -> &Path {
        &self.src_dir
    }

    /// Output root, relative to the project root. Clean removes this directory.
    pub fn dist_dir(&self) -> &Path {
        &self.dist_dir
    }
}

impl Default for PathTable {
    fn default() -> Self {
        Self::new("src", "dist")
    }
}

/// Compile a glob whose `*` stops at `/` and whose `**` spans directories.
pub fn compile_glob(pattern: &str) -> Result<GlobMatcher, TaskError> {
    let glob = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|e| TaskError::Glob {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
    Ok(glob.compile_matcher())
}

/// Path of `path` relative to `root`, with forward slashes.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    Some(rel.to_string_lossy().replace('\\', "/"))
}

fn glob_prefix(dir: &Path) -> String {
    let dir = dir.to_string_lossy().replace('\\', "/");
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() || dir == "." {
        String::new()
    } else {
        format!("{dir}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn default_table_matches_conventional_layout() {
        let table = PathTable::default();

        let html = table.entry(Category::Html);
        assert_eq!(html.source_glob, "src/*.html");
        assert_eq!(html.output_dir, PathBuf::from("dist/"));

        let css = table.entry(Category::Css);
        assert_eq!(css.source_base, PathBuf::from("src/assets/scss"));
        assert_eq!(css.output_dir, PathBuf::from("dist/assets/css"));
    }

    #[test]
    fn every_category_has_an_entry() {
        let table = PathTable::default();
        for category in Category::ALL {
            assert_eq!(table.entry(category).category, category);
        }
    }

    #[test]
    fn html_source_glob_is_root_level_only() {
        let table = PathTable::default();
        let html = table.entry(Category::Html);

        let source = html.source_matcher().unwrap();
        assert!(source.is_match("src/index.html"));
        assert!(!source.is_match("src/templates/layouts/default.html"));

        let watch = html.watch_matcher().unwrap();
        assert!(watch.is_match("src/index.html"));
        assert!(watch.is_match("src/templates/layouts/default.html"));
    }

    #[test]
    fn image_glob_matches_listed_extensions() {
        let table = PathTable::default();
        let images = table.entry(Category::Images).source_matcher().unwrap();

        assert!(images.is_match("src/assets/images/logo.png"));
        assert!(images.is_match("src/assets/images/icons/site.webmanifest"));
        assert!(!images.is_match("src/assets/images/notes.txt"));
    }

    #[test]
    fn custom_roots_prefix_globs() {
        let table = PathTable::new("web", "public");
        let js = table.entry(Category::Js);

        assert_eq!(js.source_glob, "web/assets/js/*.js");
        assert_eq!(js.output_dir, PathBuf::from("public/assets/js"));
        assert_eq!(table.dist_dir(), Path::new("public"));
    }

    #[test]
    fn discovers_sorted_matching_files() {
        let temp = tempdir().unwrap();
        let js_dir = temp.path().join("src/assets/js");
        fs::create_dir_all(js_dir.join("vendor")).unwrap();
        fs::write(js_dir.join("main.js"), "").unwrap();
        fs::write(js_dir.join("app.js"), "").unwrap();
        fs::write(js_dir.join("vendor/lib.js"), "").unwrap();
        fs::write(js_dir.join("readme.md"), "").unwrap();

        let table = PathTable::default();
        let files = table.entry(Category::Js).discover(temp.path()).unwrap();

        assert_eq!(files, vec![js_dir.join("app.js"), js_dir.join("main.js")]);
    }

    #[test]
    fn discovery_without_source_dir_is_empty() {
        let temp = tempdir().unwrap();
        let table = PathTable::default();

        for entry in table.entries() {
            assert!(entry.discover(temp.path()).unwrap().is_empty());
        }
    }

    #[test]
    fn parses_category_names() {
        assert_eq!("fonts".parse::<Category>(), Ok(Category::Fonts));
        assert!("clean".parse::<Category>().is_err());
    }
}
