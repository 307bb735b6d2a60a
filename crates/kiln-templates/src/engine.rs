//! Template engine composing pages from layouts, partials and data.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use minijinja::{context, AutoEscape, Environment, Value};
use serde_json::Map;
use walkdir::WalkDir;

use crate::data::load_data_dir;
use crate::frontmatter::{extract_frontmatter, FrontmatterError};

/// Layout used when a page does not name one in its front matter.
pub const DEFAULT_LAYOUT: &str = "default";

/// Directories the engine reads templates and data from.
#[derive(Debug, Clone)]
pub struct TemplateRoots {
    /// Directory pages live in; `root` in page contexts is relative to it
    pub root: PathBuf,
    /// Layout templates, named by file stem
    pub layouts: PathBuf,
    /// Partial templates, named by file stem
    pub partials: PathBuf,
    /// JSON and YAML data files, keyed by file stem
    pub data: PathBuf,
}

impl TemplateRoots {
    /// Conventional layout under `root`: `templates/{layouts,partials,data}`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let templates = root.join("templates");
        Self {
            layouts: templates.join("layouts"),
            partials: templates.join("partials"),
            data: templates.join("data"),
            root,
        }
    }
}

/// Errors that can occur while loading templates or rendering a page.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Failed to read {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("Invalid data file {path}: {message}")]
    Data { path: PathBuf, message: String },

    #[error("{path}: {source}")]
    Frontmatter {
        path: PathBuf,
        #[source]
        source: FrontmatterError,
    },

    #[error("Template {name} failed to compile: {message}")]
    Syntax { name: String, message: String },

    #[error("Failed to render {name}: {message}")]
    Render { name: String, message: String },

    #[error("No layout named \"{0}\" exists")]
    MissingLayout(String),
}

/// Template engine using minijinja.
///
/// Layouts, partials and data are read once in [`TemplateEngine::load`]; build a
/// fresh engine for every run to pick up edits.
pub struct TemplateEngine {
    env: Environment<'static>,
    layouts: BTreeSet<String>,
    data: Map<String, serde_json::Value>,
}

impl TemplateEngine {
    /// Load layouts, partials and data from disk.
    pub fn load(roots: &TemplateRoots) -> Result<Self, TemplateError> {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::Html);

        let mut layouts = BTreeSet::new();
        for (stem, source) in read_templates(&roots.layouts)? {
            let name = format!("layouts/{}", stem);
            add_template(&mut env, name, source)?;
            layouts.insert(stem);
        }

        for (stem, source) in read_templates(&roots.partials)? {
            add_template(&mut env, stem, source)?;
        }

        let data = load_data_dir(&roots.data)?;

        Ok(Self { env, layouts, data })
    }

    /// Names of the loaded layouts.
    pub fn layouts(&self) -> impl Iterator<Item = &str> {
        self.layouts.iter().map(String::as_str)
    }

    /// Render a page and wrap it in its layout.
    ///
    /// `relative` is the page path relative to the template root; it names the
    /// page in error messages and determines the `page` and `root` variables.
    pub fn render_page(&self, relative: &Path, source: &str) -> Result<String, TemplateError> {
        let name = relative.to_string_lossy().replace('\\', "/");

        let (frontmatter, body) =
            extract_frontmatter(source).map_err(|source| TemplateError::Frontmatter {
                path: relative.to_path_buf(),
                source,
            })?;
        let frontmatter = frontmatter.unwrap_or_default();

        let layout = frontmatter
            .get("layout")
            .and_then(|v| v.as_str())
            .unwrap_or(DEFAULT_LAYOUT)
            .to_string();
        if !self.layouts.contains(&layout) {
            return Err(TemplateError::MissingLayout(layout));
        }

        let mut vars = self.data.clone();
        vars.extend(frontmatter);
        vars.insert("page".into(), page_stem(relative).into());
        vars.insert("root".into(), relative_root(relative).into());
        let vars = Value::from_serialize(&vars);

        let content = self
            .env
            .render_named_str(&name, body, &vars)
            .map_err(|e| TemplateError::Render {
                name: name.clone(),
                message: e.to_string(),
            })?;

        let layout_name = format!("layouts/{}", layout);
        let tmpl = self
            .env
            .get_template(&layout_name)
            .map_err(|e| TemplateError::Render {
                name: layout_name.clone(),
                message: e.to_string(),
            })?;

        tmpl.render(context! {
            body => Value::from_safe_string(content),
            ..vars
        })
        .map_err(|e| TemplateError::Render {
            name: layout_name,
            message: e.to_string(),
        })
    }
}

fn add_template(
    env: &mut Environment<'static>,
    name: String,
    source: String,
) -> Result<(), TemplateError> {
    env.add_template_owned(name.clone(), source)
        .map_err(|e| TemplateError::Syntax {
            name,
            message: e.to_string(),
        })
}

/// Read all template files under `dir`, keyed by file stem.
fn read_templates(dir: &Path) -> Result<Vec<(String, String)>, TemplateError> {
    let mut templates = Vec::new();

    if !dir.exists() {
        return Ok(templates);
    }

    for entry in WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !entry.file_type().is_file() {
            continue;
        }

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !matches!(ext, "html" | "htm" | "hbs") {
            continue;
        }

        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };

        let source = fs::read_to_string(path).map_err(|e| TemplateError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        templates.push((stem.to_string(), source));
    }

    Ok(templates)
}

fn page_stem(relative: &Path) -> String {
    relative
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("index")
        .to_string()
}

/// `../` once per directory between the page and the template root.
fn relative_root(relative: &Path) -> String {
    let depth = relative.components().count().saturating_sub(1);
    "../".repeat(depth)
}
