//! Front matter extraction and parsing.

use serde_json::{Map, Value};

/// Variables declared in a page's front matter block.
pub type FrontMatter = Map<String, Value>;

/// Extract front matter from a page source.
///
/// Returns the parsed variables and the remaining body after the front matter block.
/// A page without a leading `---` line has no front matter and is returned unchanged.
pub fn extract_frontmatter(source: &str) -> Result<(Option<FrontMatter>, &str), FrontmatterError> {
    let trimmed = source.trim_start();

    if !trimmed.starts_with("---") {
        return Ok((None, source));
    }

    // Find the closing ---
    let after_open = &trimmed[3..];
    let Some(close_pos) = after_open.find("\n---") else {
        return Err(FrontmatterError::Unclosed);
    };

    let yaml_content = after_open[..close_pos].trim();
    let remaining = &after_open[close_pos + 4..];

    // The closing delimiter owns the rest of its line.
    let remaining = match remaining.find('\n') {
        Some(newline) if remaining[..newline].trim().is_empty() => &remaining[newline + 1..],
        _ if remaining.trim().is_empty() => "",
        _ => remaining,
    };

    if yaml_content.is_empty() {
        return Ok((Some(FrontMatter::new()), remaining));
    }

    let value: Value = serde_yaml::from_str(yaml_content)
        .map_err(|e| FrontmatterError::InvalidYaml(e.to_string()))?;

    match value {
        Value::Object(map) => Ok((Some(map), remaining)),
        Value::Null => Ok((Some(FrontMatter::new()), remaining)),
        _ => Err(FrontmatterError::NotAMapping),
    }
}

/// Errors that can occur when parsing front matter.
#[derive(Debug, thiserror::Error)]
pub enum FrontmatterError {
    #[error("Unclosed front matter block - missing closing ---")]
    Unclosed,

    #[error("Invalid YAML in front matter: {0}")]
    InvalidYaml(String),

    #[error("Front matter must be a mapping of variables")]
    NotAMapping,
}
