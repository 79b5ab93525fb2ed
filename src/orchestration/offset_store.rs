//! Persisted poll offset: a text file holding the decimal identifier of the
//! next update to fetch.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct OffsetStore {
    path: PathBuf,
}

impl OffsetStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// An absent or empty file reads as offset 0. Content that is not a
    /// number is logged and also read as 0.
    pub async fn load(&self) -> Result<i64> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Ok(0);
        }
        match trimmed.parse::<i64>() {
            Ok(offset) => Ok(offset),
            Err(_) => {
                warn!(path = %self.path.display(), content = trimmed, "Offset file is not a number, starting from 0");
                Ok(0)
            }
        }
    }

    pub async fn save(&self, offset: i64) -> Result<()> {
        fs::write(&self.path, offset.to_string()).await?;
        debug!(offset, "Poll offset saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_absent_and_empty_read_as_zero() {
        let dir = tempfile::tempdir().unwrap();
        let store = OffsetStore::new(dir.path().join("lastupdate.txt"));
        assert_eq!(store.load().await.unwrap(), 0);

        std::fs::write(store.path(), " \n").unwrap();
        assert_eq!(store.load().await.unwrap(), 0);

        std::fs::write(store.path(), "garbage").unwrap();
        assert_eq!(store.load().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = OffsetStore::new(dir.path().join("lastupdate.txt"));

        store.save(104).await.unwrap();
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "104");
        assert_eq!(store.load().await.unwrap(), 104);
    }
}
