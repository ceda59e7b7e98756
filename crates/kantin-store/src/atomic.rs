//! Write-new-then-replace file helper.
//!
//! ```text
//! products.csv.tmp ──write──► fsync ──rename──► products.csv
//!        │
//!        └── any failure: temp file removed, products.csv untouched
//! ```
//!
//! `rename` within one directory is atomic on every filesystem we run on, so
//! a reader sees either the old file or the new one, never a mix.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::warn;

use crate::error::{StoreError, StoreResult};

/// Sibling temp path: `products.csv` → `products.csv.tmp`.
pub(crate) fn temp_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Replaces `path` with `contents`, or leaves it untouched on error.
pub(crate) async fn write_atomic(path: &Path, contents: &[u8]) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::write_failed(path, e))?;
        }
    }

    let tmp = temp_path(path);
    let result: std::io::Result<()> = async {
        let mut file = fs::File::create(&tmp).await?;
        file.write_all(contents).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&tmp, path).await
    }
    .await;

    if let Err(err) = result {
        if let Err(cleanup) = fs::remove_file(&tmp).await {
            if cleanup.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %tmp.display(), error = %cleanup, "Could not remove temp file");
            }
        }
        return Err(StoreError::write_failed(path, err));
    }

    Ok(())
}
