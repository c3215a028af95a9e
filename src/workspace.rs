//! Staging and output directories, reset to empty before every run.

use crate::error::PipelineError;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

/// The two working directories of a run.
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Raw examples extracted from the documentation
    pub staging: PathBuf,
    /// Compiled and scaffolded test files
    pub output: PathBuf,
}

impl Workspace {
    pub fn new(staging: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            staging: staging.into(),
            output: output.into(),
        }
    }

    /// Delete both directories if present and recreate them empty.
    ///
    /// Any failure aborts the run; a half-cleaned workspace would leave
    /// wrapped files from a previous run in place.
    pub async fn reset(&self) -> Result<(), PipelineError> {
        for dir in [&self.staging, &self.output] {
            clear_dir(dir).await.map_err(|source| PipelineError::Reset {
                path: dir.clone(),
                source,
            })?;
        }
        tracing::debug!(
            staging = %self.staging.display(),
            output = %self.output.display(),
            "workspace reset"
        );
        Ok(())
    }
}

async fn clear_dir(dir: &Path) -> io::Result<()> {
    match fs::remove_dir_all(dir).await {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    fs::create_dir_all(dir).await
}

/// Regular files directly inside `dir`, sorted by name.
///
/// This is the live directory listing, so files placed there by anything
/// other than this pipeline are included.
pub async fn list_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}
