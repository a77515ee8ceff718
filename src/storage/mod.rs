//! File-backed stores.
//!
//! ## Directory Structure
//!
//! ```text
//! {root}/
//! ├── config.toml            # Harvester configuration
//! ├── result_manifest.json   # Flat manifest, newest first
//! ├── history.json           # Rich history, newest first
//! ├── note/
//! │   ├── SS-498-2025-09-16.json
//! │   └── latest.json        # Copy of the newest draw
//! └── cache/                 # Disposable page cache
//!     └── {sha256(url)}.json
//! ```
//!
//! Both stores are single-writer; callers process one URL at a time.

pub mod cache;
pub mod records;

use std::path::Path;

use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};

pub use cache::CacheStore;
pub use records::RecordStore;

/// Ensure the parent directory of `path` exists.
async fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(())
}

/// Write bytes atomically (write to temp, then rename).
pub(crate) async fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    ensure_parent(path).await?;

    let tmp = path.with_extension("tmp");
    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    drop(file);

    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// Write pretty-printed JSON atomically.
pub(crate) async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    write_bytes(path, &bytes).await
}

/// Read bytes, returning None if the file doesn't exist.
pub(crate) async fn read_bytes(path: &Path) -> Result<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AppError::Io(e)),
    }
}

/// Read JSON, returning None if the file doesn't exist.
pub(crate) async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match read_bytes(path).await? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}
