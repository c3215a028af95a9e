//! Write selected code blocks into the staging directory.

use crate::error::PipelineError;
use crate::extract::CodeBlock;
use crate::stage::fan_out;
use std::path::{Path, PathBuf};

/// Write every block to `staging/example<N>.<ext>`, concurrently.
///
/// Fails on the first write error. Returns the written paths sorted by name.
pub async fn materialize(
    blocks: Vec<CodeBlock>,
    staging: &Path,
    ext: &str,
) -> Result<Vec<PathBuf>, PipelineError> {
    tracing::info!("staging {} example(s) in {}", blocks.len(), staging.display());

    let mut written = fan_out(blocks, |block| {
        let path = staging.join(block.file_name(ext));
        async move {
            tracing::info!(
                tag = %block.tag,
                source = %block.source.display(),
                line = block.line,
                "writing {}",
                path.display()
            );
            tokio::fs::write(&path, block.body.as_bytes())
                .await
                .map_err(|source| PipelineError::Materialize {
                    path: path.clone(),
                    source,
                })?;
            Ok(path)
        }
    })
    .await?;

    written.sort();
    Ok(written)
}
