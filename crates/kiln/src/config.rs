//! Configuration file (kiln.toml).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use kiln_pipeline::{PathTable, PipelineConfig};
use kiln_server::DevServerConfig;
use serde::Deserialize;

/// Configuration file structure (kiln.toml).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub css: CssConfig,
    #[serde(default)]
    pub images: ImagesConfig,
}

#[derive(Debug, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_src")]
    pub src: String,
    #[serde(default = "default_dist")]
    pub dist: String,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_true")]
    pub open: bool,
}

#[derive(Debug, Deserialize)]
pub struct WatchConfig {
    /// Quiet period before a triggered task runs; 0 runs immediately
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct CssConfig {
    /// Browserslist queries for vendor prefixing
    #[serde(default = "default_browsers")]
    pub browsers: Vec<String>,
    #[serde(default = "default_min_suffix")]
    pub min_suffix: String,
}

#[derive(Debug, Deserialize)]
pub struct ImagesConfig {
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            src: default_src(),
            dist: default_dist(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            open: default_true(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl Default for CssConfig {
    fn default() -> Self {
        Self {
            browsers: default_browsers(),
            min_suffix: default_min_suffix(),
        }
    }
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

fn default_src() -> String {
    "src".to_string()
}
fn default_dist() -> String {
    "dist".to_string()
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    3000
}
fn default_true() -> bool {
    true
}
fn default_debounce_ms() -> u64 {
    100
}
fn default_browsers() -> Vec<String> {
    vec!["defaults".to_string()]
}
fn default_min_suffix() -> String {
    ".min".to_string()
}
fn default_jpeg_quality() -> u8 {
    80
}

/// Load configuration from `path` if it exists.
/// Returns an error if the config file exists but is malformed.
pub fn load_config(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        tracing::debug!("No {}, using defaults", path.display());
        return Ok(ConfigFile::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    if !(1..=100).contains(&config.images.jpeg_quality) {
        anyhow::bail!(
            "{}: images.jpeg_quality must be between 1 and 100, got {}",
            path.display(),
            config.images.jpeg_quality
        );
    }

    tracing::debug!("Loaded config from {}", path.display());
    Ok(config)
}

impl ConfigFile {
    /// Pipeline settings for a project rooted at `root`.
    pub fn pipeline(&self, root: impl Into<PathBuf>) -> PipelineConfig {
        PipelineConfig {
            root: root.into(),
            paths: PathTable::new(&self.paths.src, &self.paths.dist),
            min_suffix: self.css.min_suffix.clone(),
            browsers: self.css.browsers.clone(),
            jpeg_quality: self.images.jpeg_quality,
        }
    }

    /// Dev server settings serving the output tree under `root`.
    pub fn server(&self, root: &Path) -> DevServerConfig {
        DevServerConfig {
            root_dir: root.join(&self.paths.dist),
            host: self.server.host.clone(),
            port: self.server.port,
            open: self.server.open,
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.watch.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_means_defaults() {
        let temp = tempdir().unwrap();

        let config = load_config(&temp.path().join("kiln.toml")).unwrap();

        assert_eq!(config.paths.src, "src");
        assert_eq!(config.paths.dist, "dist");
        assert_eq!(config.server.port, 3000);
        assert!(config.server.open);
        assert_eq!(config.debounce(), Duration::from_millis(100));
        assert_eq!(config.css.min_suffix, ".min");
        assert_eq!(config.images.jpeg_quality, 80);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("kiln.toml");
        fs::write(
            &path,
            "[server]\nport = 8080\n\n[css]\nmin_suffix = \"-min\"\n",
        )
        .unwrap();

        let config = load_config(&path).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.css.min_suffix, "-min");
        assert_eq!(config.css.browsers, vec!["defaults".to_string()]);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("kiln.toml");
        fs::write(&path, "[server\nport = ").unwrap();

        assert!(load_config(&path).is_err());
    }

    #[test]
    fn rejects_out_of_range_quality() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("kiln.toml");
        fs::write(&path, "[images]\njpeg_quality = 0\n").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("jpeg_quality"));
    }

    #[test]
    fn builds_pipeline_and_server_settings() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("kiln.toml");
        fs::write(&path, "[paths]\nsrc = \"site\"\ndist = \"public\"\n").unwrap();
        let config = load_config(&path).unwrap();

        let pipeline = config.pipeline(temp.path());
        let server = config.server(temp.path());

        assert_eq!(pipeline.root, temp.path());
        assert_eq!(pipeline.paths.src_dir(), Path::new("site"));
        assert_eq!(pipeline.paths.dist_dir(), Path::new("public"));
        assert_eq!(server.root_dir, temp.path().join("public"));
    }
}
