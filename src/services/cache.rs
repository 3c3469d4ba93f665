//! On-disk cache of raw provider responses.
//!
//! Layout: `{cache_dir}/{SYMBOL}.{range}.json`, one entry per symbol and range.
//! Writes go to a `.tmp` file and are renamed into place. Entries that cannot
//! be decoded are removed and treated as misses.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::HistoryRange;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to clear cache at {path}: {source}")]
    Reset {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write cache entry {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode cache entry: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    symbol: String,
    range: HistoryRange,
    stored_at: i64,
    body: String,
}

#[derive(Debug, Clone)]
pub struct ResponseCache {
    dir: PathBuf,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, symbol: &str, range: HistoryRange) -> PathBuf {
        let safe: String = symbol
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{safe}.{}.json", range.as_str()))
    }

    /// Cached body for `symbol`/`range` if present and younger than the TTL.
    pub async fn get(&self, symbol: &str, range: HistoryRange) -> Option<String> {
        let path = self.entry_path(symbol, range);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cache: unreadable entry");
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_slice(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cache: corrupt entry, removing");
                let _ = tokio::fs::remove_file(&path).await;
                return None;
            }
        };

        if entry.symbol != symbol || entry.range != range {
            return None;
        }

        let age = Utc::now().timestamp() - entry.stored_at;
        if age < 0 || age as u64 >= self.ttl.as_secs() {
            debug!(symbol, range = %range, age, "Cache: entry expired");
            return None;
        }

        Some(entry.body)
    }

    pub async fn put(&self, symbol: &str, range: HistoryRange, body: &str) -> Result<(), CacheError> {
        let path = self.entry_path(symbol, range);
        let entry = CacheEntry {
            symbol: symbol.to_string(),
            range,
            stored_at: Utc::now().timestamp(),
            body: body.to_string(),
        };
        let encoded = serde_json::to_vec(&entry)?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| CacheError::Write {
                path: self.dir.clone(),
                source,
            })?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &encoded)
            .await
            .map_err(|source| CacheError::Write {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|source| CacheError::Write { path, source })
    }

    /// Drops the entry for `symbol`/`range`; a missing entry is not an error.
    pub async fn remove(&self, symbol: &str, range: HistoryRange) {
        let path = self.entry_path(symbol, range);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!(symbol, range = %range, "Cache: entry removed"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Cache: failed to remove entry"),
        }
    }
}

/// Housekeeping run before each cycle: wipes every cached response under
/// `dir`. A directory that does not exist is already clean.
pub struct CacheReset;

impl CacheReset {
    pub async fn reset(dir: &Path) -> Result<(), CacheError> {
        match tokio::fs::remove_dir_all(dir).await {
            Ok(()) => {
                debug!(path = %dir.display(), "CacheReset: cleared");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CacheError::Reset {
                path: dir.to_path_buf(),
                source,
            }),
        }
    }
}
