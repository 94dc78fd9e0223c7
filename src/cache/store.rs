//! Disk-backed response store
//!
//! Each key maps to one file under the cache root. Writes land in a temporary
//! file next to the target and are renamed into place, so readers see either
//! the previous or the new complete entry. Writers to the same key are
//! serialized through a striped lock.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use tokio::fs;
use tokio::sync::Mutex;

use super::key::CacheKey;
use crate::error::{ProxyError, ProxyResult};
use crate::http::{freshness, response};

/// Number of write lock stripes
const LOCK_STRIPES: usize = 64;

/// Result of looking a key up in the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    /// Entry exists and may be served
    Fresh(Vec<u8>),
    /// Entry exists but has expired; handled like a miss
    Stale(Vec<u8>),
    /// Nothing stored under this key
    Absent,
}

/// Persistent mapping from cache key to raw response bytes
pub struct DiskStore {
    root: PathBuf,
    write_locks: Vec<Mutex<()>>,
    tmp_counter: AtomicU64,
}

impl DiskStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_locks: (0..LOCK_STRIPES).map(|_| Mutex::new(())).collect(),
            tmp_counter: AtomicU64::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing `key`.
    ///
    /// Only normal path components of the key are used, so the result always
    /// stays under the cache root.
    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        let relative: PathBuf = Path::new(key.as_str())
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part),
                _ => None,
            })
            .collect();
        self.root.join(relative)
    }

    /// Read the stored bytes for `key`, `None` if nothing is stored.
    pub async fn get(&self, key: &CacheKey) -> ProxyResult<Option<Vec<u8>>> {
        match fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ProxyError::CacheRead {
                key: key.to_string(),
                source,
            }),
        }
    }

    /// Read `key` and classify it by freshness at `now`.
    pub async fn lookup(&self, key: &CacheKey, now: DateTime<Utc>) -> ProxyResult<CacheLookup> {
        let Some(bytes) = self.get(key).await? else {
            return Ok(CacheLookup::Absent);
        };

        let (_, headers) = response::parse_head(&bytes);
        if freshness::is_fresh(&headers, now) {
            Ok(CacheLookup::Fresh(bytes))
        } else {
            Ok(CacheLookup::Stale(bytes))
        }
    }

    /// Store `bytes` under `key`, replacing any previous entry.
    pub async fn put(&self, key: &CacheKey, bytes: &[u8]) -> ProxyResult<()> {
        let _guard = self.write_locks[Self::stripe(key)].lock().await;

        let path = self.path_for(key);
        self.write_atomic(&path, bytes)
            .await
            .map_err(|source| ProxyError::CacheWrite {
                key: key.to_string(),
                source,
            })
    }

    async fn write_atomic(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let (Some(dir), Some(name)) = (path.parent(), path.file_name()) else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("no file name in cache path {}", path.display()),
            ));
        };
        fs::create_dir_all(dir).await?;

        let seq = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        let tmp_path = dir.join(format!(
            ".{}.{}.{seq}.tmp",
            name.to_string_lossy(),
            std::process::id()
        ));

        if let Err(e) = fs::write(&tmp_path, bytes).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e);
        }
        if let Err(e) = fs::rename(&tmp_path, path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e);
        }
        Ok(())
    }

    fn stripe(key: &CacheKey) -> usize {
        let mut hasher = DefaultHasher::new();
        key.as_str().hash(&mut hasher);
        usize::try_from(hasher.finish() % LOCK_STRIPES as u64).unwrap_or(0)
    }
}
