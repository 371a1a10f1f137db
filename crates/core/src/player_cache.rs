//! On-disk cache for opaque player blobs.
//!
//! Keys come from renderer windows, so they are flattened into a single
//! file name before touching the filesystem.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::Error;

#[derive(Debug, Clone)]
pub struct PlayerCache {
    dir: PathBuf,
}

/// Replace path separators and dots so a key can only name a file
/// directly inside the cache directory.
pub fn sanitize_key(key: &str) -> String {
    key.replace(['.', '/', '\\'], "__")
}

impl PlayerCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(sanitize_key(key))
    }

    /// Read a cached blob. A missing file is not an error.
    pub async fn get(&self, key: &str) -> Result<Option<Bytes>, Error> {
        match tokio::fs::read(self.path_for(key)).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => {
                tracing::warn!(key, error = %e, "player cache read failed");
                Err(e.into())
            }
        }
    }

    /// Store a blob, creating the cache directory on first use.
    pub async fn set(&self, key: &str, data: &[u8]) -> Result<(), Error> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(key);
        tokio::fs::write(&path, data).await?;
        tracing::debug!(path = %path.display(), bytes = data.len(), "player cache entry written");
        Ok(())
    }
}
