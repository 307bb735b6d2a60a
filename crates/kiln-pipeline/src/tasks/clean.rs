//! Clean task: remove the output tree.

use std::io;
use std::path::Path;

use crate::tasks::TaskError;

/// Recursively delete `dir`. A missing directory is not an error.
pub async fn run(dir: &Path) -> Result<(), TaskError> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {
            tracing::info!("Removed {}", dir.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(TaskError::io(dir, e)),
    }
}
