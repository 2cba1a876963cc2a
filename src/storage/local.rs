//! Local filesystem storage implementation.
//!
//! Keeps the store document in one file. Writes go to a sibling `.tmp`
//! file first and are renamed over the target, so a crash mid-write never
//! leaves a truncated document behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::storage::StoreBackend;

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    path: PathBuf,
}

impl LocalStorage {
    /// Create a LocalStorage for the given document path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Sibling temp file: the document name with `.tmp` appended.
    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }

    async fn write_temp(tmp: &Path, bytes: &[u8]) -> Result<()> {
        let mut file = tokio::fs::File::create(tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        Ok(())
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl StoreBackend for LocalStorage {
    async fn read(&self) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    async fn write(&self, bytes: &[u8]) -> Result<()> {
        self.ensure_dir().await?;

        let tmp = self.temp_path();
        let result = match Self::write_temp(&tmp, bytes).await {
            Ok(()) => tokio::fs::rename(&tmp, &self.path).await.map_err(AppError::from),
            Err(e) => Err(e),
        };
        if result.is_err() {
            let _ = tokio::fs::remove_file(&tmp).await;
        }
        result
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_and_read() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path().join("store.json"));

        storage.write(b"{}").await.unwrap();
        let data = storage.read().await.unwrap();
        assert_eq!(data, Some(b"{}".to_vec()));
        assert!(!tmp.path().join("store.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_write_to_tmp_named_document() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path().join("data.tmp"));

        storage.write(b"[1]").await.unwrap();
        assert_eq!(storage.read().await.unwrap(), Some(b"[1]".to_vec()));
        assert!(!tmp.path().join("data.tmp.tmp").exists());
    }

    #[tokio::test]
    async fn test_failed_write_removes_temp_file() {
        let tmp = TempDir::new().unwrap();
        // A directory at the target makes the final rename fail.
        let target = tmp.path().join("store.json");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("keep"), b"x").unwrap();
        let storage = LocalStorage::new(target.clone());

        assert!(storage.write(b"{}").await.is_err());
        assert!(!tmp.path().join("store.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_read_nonexistent() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path().join("nope.json"));

        let data = storage.read().await.unwrap();
        assert!(data.is_none());
    }

    #[tokio::test]
    async fn test_write_creates_parent_dirs() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path().join("a/b/store.json"));

        storage.write(b"{}").await.unwrap();
        assert!(tmp.path().join("a/b/store.json").exists());
    }

    #[tokio::test]
    async fn test_write_fails_below_regular_file() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let storage = LocalStorage::new(blocker.join("store.json"));

        assert!(storage.write(b"{}").await.is_err());
    }
}
