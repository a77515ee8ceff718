//! TTL-based page cache keyed by URL hash.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::storage::{read_bytes, write_json};

/// One cached fetch result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedEntry {
    pub url: String,
    pub content: String,
    pub stored_at: DateTime<Utc>,
}

/// Content-addressed store mapping a URL to previously fetched text.
///
/// Stale and corrupt entries read as absent; corrupt files are removed.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
    ttl: chrono::Duration,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(36_500)),
        }
    }

    /// Stable lookup key for a URL.
    pub fn key(url: &str) -> String {
        hex::encode(Sha256::digest(url.as_bytes()))
    }

    fn entry_path(&self, url: &str) -> PathBuf {
        self.dir.join(format!("{}.json", Self::key(url)))
    }

    pub async fn get(&self, url: &str) -> Option<String> {
        self.get_at(url, Utc::now()).await
    }

    /// Lookup as of `now`; an entry is stale once `now - stored_at > ttl`.
    pub async fn get_at(&self, url: &str, now: DateTime<Utc>) -> Option<String> {
        self.entry_at(url, now).await.map(|entry| entry.content)
    }

    /// Like `get`, but entries stored before `since` read as absent.
    pub async fn get_since(&self, url: &str, since: DateTime<Utc>) -> Option<String> {
        self.entry_at(url, Utc::now())
            .await
            .filter(|entry| entry.stored_at >= since)
            .map(|entry| entry.content)
    }

    async fn entry_at(&self, url: &str, now: DateTime<Utc>) -> Option<CachedEntry> {
        let path = self.entry_path(url);
        let bytes = match read_bytes(&path).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("Cache read failed for {}: {}", url, e);
                return None;
            }
        };

        let entry: CachedEntry = match serde_json::from_slice(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Purging corrupt cache entry {}: {}", path.display(), e);
                if let Err(e) = tokio::fs::remove_file(&path).await {
                    log::warn!("Could not remove {}: {}", path.display(), e);
                }
                return None;
            }
        };

        if now.signed_duration_since(entry.stored_at) > self.ttl {
            log::debug!("Cache stale: {}", url);
            return None;
        }

        log::debug!("Cache hit: {}", url);
        Some(entry)
    }

    pub async fn put(&self, url: &str, content: &str) -> Result<()> {
        self.put_at(url, content, Utc::now()).await
    }

    /// Unconditional overwrite stamped with `stored_at`.
    pub async fn put_at(&self, url: &str, content: &str, stored_at: DateTime<Utc>) -> Result<()> {
        let entry = CachedEntry {
            url: url.to_string(),
            content: content.to_string(),
            stored_at,
        };
        write_json(&self.entry_path(url), &entry).await
    }
}
