//! Data files injected into every page context.

use std::fs;
use std::path::Path;

use serde_json::{Map, Value};
use walkdir::WalkDir;

use crate::engine::TemplateError;

/// Load every `.json`, `.yml` and `.yaml` file under `dir`, keyed by file stem.
///
/// A missing directory yields an empty map. When two files share a stem the
/// one visited last (in file name order) wins.
pub fn load_data_dir(dir: &Path) -> Result<Map<String, Value>, TemplateError> {
    let mut data = Map::new();

    if !dir.exists() {
        return Ok(data);
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
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };

        let content = match ext {
            "json" | "yml" | "yaml" => fs::read_to_string(path).map_err(|e| TemplateError::Io {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?,
            _ => continue,
        };

        let value: Value = if ext == "json" {
            serde_json::from_str(&content).map_err(|e| TemplateError::Data {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        } else {
            serde_yaml::from_str(&content).map_err(|e| TemplateError::Data {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        };

        data.insert(stem.to_string(), value);
    }

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn loads_json_and_yaml_by_stem() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("site.json"), r#"{"name": "Kiln"}"#).unwrap();
        fs::create_dir_all(temp.path().join("nested")).unwrap();
        fs::write(
            temp.path().join("nested/menu.yml"),
            "- home\n- about\n",
        )
        .unwrap();
        fs::write(temp.path().join("notes.txt"), "ignored").unwrap();

        let data = load_data_dir(temp.path()).unwrap();

        assert_eq!(data["site"]["name"], "Kiln");
        assert_eq!(data["menu"][1], "about");
        assert!(!data.contains_key("notes"));
    }

    #[test]
    fn missing_directory_is_empty() {
        let temp = tempdir().unwrap();
        let data = load_data_dir(&temp.path().join("nope")).unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn reports_malformed_data() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("broken.json"), "{ nope").unwrap();

        let err = load_data_dir(temp.path()).unwrap_err();

        assert!(matches!(err, TemplateError::Data { .. }));
        assert!(err.to_string().contains("broken.json"));
    }
}
