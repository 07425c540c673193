use std::{
    fs, io,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use log::{debug, warn};
use serde_json::Value;
use thiserror::Error;

/// Errors raised by [`TtlCache`].
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cache file {} is not valid JSON: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The fetch failed and nothing was cached.
    #[error("{key} is unavailable: {reason}")]
    Unavailable { key: String, reason: String },
}

/// JSON documents cached as files in one directory, expired by file age.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtlCache {
    dir: PathBuf,
}

impl TtlCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    /// Whether `key` was written less than `ttl` ago.
    pub fn is_fresh(&self, key: &str, ttl: Duration) -> bool {
        fs::metadata(self.path(key))
            .and_then(|meta| meta.modified())
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok())
            .is_some_and(|age| age < ttl)
    }

    /// Cached document for `key`; `None` when nothing is cached.
    pub fn read(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let path = self.path(key);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(CacheError::Io { path, source }),
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|source| CacheError::Json { path, source })
    }

    pub fn write(&self, key: &str, value: &Value) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir).map_err(|source| CacheError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let path = self.path(key);
        let text = serde_json::to_string(value).map_err(|source| CacheError::Json {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, text).map_err(|source| CacheError::Io { path, source })
    }

    /// Fresh cached copy, else `fetch` (cached on success), else the stale copy.
    pub fn get_or_fetch<F>(&self, key: &str, ttl: Duration, fetch: F) -> Result<Value, CacheError>
    where
        F: FnOnce() -> anyhow::Result<Value>,
    {
        if self.is_fresh(key, ttl) {
            match self.read(key) {
                Ok(Some(value)) => {
                    debug!("cache hit for {key}");
                    return Ok(value);
                }
                Ok(None) => {}
                Err(e) => warn!("ignoring unreadable cache entry: {e}"),
            }
        }
        debug!("cache miss for {key}");
        self.refresh(key, fetch)
    }

    /// Fetch `key` regardless of age, falling back to the stale copy.
    pub fn refresh<F>(&self, key: &str, fetch: F) -> Result<Value, CacheError>
    where
        F: FnOnce() -> anyhow::Result<Value>,
    {
        match fetch() {
            Ok(value) => {
                if let Err(e) = self.write(key, &value) {
                    warn!("failed to cache {key}: {e}");
                }
                Ok(value)
            }
            Err(fetch_error) => match self.read(key) {
                Ok(Some(stale)) => {
                    warn!("fetching {key} failed ({fetch_error:#}), using stale cache");
                    Ok(stale)
                }
                _ => Err(CacheError::Unavailable {
                    key: key.to_string(),
                    reason: format!("{fetch_error:#}"),
                }),
            },
        }
    }
}
