//! Query-result cache
//!
//! Persists prior external-call results keyed by a SHA-256 hash of the
//! query, so repeated runs over unchanged input make zero additional
//! external calls for previously-seen queries. Storage is a single JSON
//! object file, rewritten on every set; datasets are hundreds of rows, so
//! that is plenty.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::sync::Mutex;

use super::Cache;

/// Content-hash key for a query string
pub fn query_key(query: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(query.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub struct FileCache {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileCache {
    /// Open the cache file, tolerating a missing or unreadable file
    /// (starts empty either way).
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = std::fs::read_to_string(&path)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    fn persist(&self, entries: &BTreeMap<String, String>) {
        match serde_json::to_string_pretty(entries) {
            Ok(raw) => {
                if let Err(e) = std::fs::write(&self.path, raw) {
                    tracing::warn!(path = %self.path.display(), "Cache write failed: {e}");
                }
            }
            Err(e) => tracing::warn!("Cache serialization failed: {e}"),
        }
    }
}

#[async_trait]
impl Cache for FileCache {
    async fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().await.get(key).cloned()
    }

    async fn set(&self, key: &str, value: &str) {
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries);
    }
}
