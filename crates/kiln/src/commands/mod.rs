//! Subcommand implementations.

use std::path::{Path, PathBuf};

pub mod build;
pub mod init;
pub mod task;
pub mod watch;

/// Project root: the directory holding the config file.
pub fn project_root(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_is_config_directory() {
        assert_eq!(project_root(Path::new("kiln.toml")), PathBuf::from("."));
        assert_eq!(
            project_root(Path::new("site/kiln.toml")),
            PathBuf::from("site")
        );
    }
}
