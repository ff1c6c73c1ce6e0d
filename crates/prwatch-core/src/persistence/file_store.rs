//! File-backed persistence, one JSON document per key.

use std::path::PathBuf;

use async_trait::async_trait;
use prwatch_paths::PrwatchPaths;
use tracing::debug;

use super::PersistenceStore;
use super::errors::PersistenceError;

/// Stores each key as `<state_dir>/<key>.json`.
///
/// Writes go through a sibling temp file and a rename so a crash mid-write
/// never leaves a truncated document behind.
#[derive(Debug, Clone)]
pub struct FileStore {
    paths: PrwatchPaths,
}

impl FileStore {
    pub fn new(paths: PrwatchPaths) -> Self {
        Self { paths }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, PersistenceError> {
        if key.trim().is_empty() {
            return Err(PersistenceError::InvalidKey {
                key: key.to_string(),
                message: "key cannot be empty".to_string(),
            });
        }
        Ok(self.paths.state_file(key))
    }
}

#[async_trait]
impl PersistenceStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(self.paths.state_dir()).await?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, value).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!(
            event = "core.persistence.write_completed",
            key = key,
            bytes = value.len(),
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, PersistenceError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
