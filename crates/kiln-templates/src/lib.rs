//! Page composition for kiln.
//!
//! Renders HTML pages with optional YAML front matter, wrapping each page in a
//! layout and resolving partials and data files from a conventional
//! `templates/` directory.

pub mod data;
pub mod engine;
pub mod frontmatter;

pub use data::load_data_dir;
pub use engine::{TemplateEngine, TemplateError, TemplateRoots, DEFAULT_LAYOUT};
pub use frontmatter::{extract_frontmatter, FrontMatter, FrontmatterError};
