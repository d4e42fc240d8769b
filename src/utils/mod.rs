//! Small filesystem helpers shared by the file-backed stores.

use crate::{Error, ErrorContext, Result};
use std::path::Path;

/// Write `data` to a sibling temp file, then rename it over `path`.
///
/// Readers observe either the previous content or the new one, never a
/// partial write. Parent directories are created on demand.
pub async fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let tmp = path.with_extension(format!("tmp-{}", uuid::Uuid::new_v4().simple()));
    tokio::fs::write(&tmp, data).await.map_err(|e| {
        Error::storage_with_context(
            e.to_string(),
            ErrorContext::new()
                .with_field_path(tmp.display().to_string())
                .with_source("write_atomic"),
        )
    })?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}
