// src/services/storage.rs

use crate::errors::{AppError, AppResult};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Blob storage for generated receipts and uploaded proofs. Keys are
/// relative, slash-separated paths such as `receipts/2024/YE2024-0A1B2C3D.pdf`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> AppResult<()>;
    /// Removes a document; a missing key is not an error.
    async fn delete(&self, key: &str) -> AppResult<()>;
}

/// Stores documents under a root directory that is also served at `/files`.
#[derive(Debug, Clone)]
pub struct FileDocumentStore {
    root: PathBuf,
}

impl FileDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, key: &str) -> AppResult<PathBuf> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(AppError::Storage(format!("Invalid document key: {}", key)));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl DocumentStore for FileDocumentStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> AppResult<()> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Storage(e.to_string()))?;
        }
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        debug!("Stored {} ({} bytes)", key, bytes.len());
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Removed {}", key);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Storage(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_nested_keys_under_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDocumentStore::new(dir.path());

        store
            .put("receipts/2024/YE2024-0A1B2C3D.pdf", b"%PDF-1.5".to_vec())
            .await
            .unwrap();

        let written = std::fs::read(dir.path().join("receipts/2024/YE2024-0A1B2C3D.pdf")).unwrap();
        assert_eq!(written, b"%PDF-1.5");
    }

    #[tokio::test]
    async fn delete_removes_the_file_and_tolerates_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDocumentStore::new(dir.path());
        store.put("proofs/a.png", vec![1, 2, 3]).await.unwrap();

        store.delete("proofs/a.png").await.unwrap();
        assert!(!dir.path().join("proofs/a.png").exists());

        store.delete("proofs/a.png").await.unwrap();
    }

    #[tokio::test]
    async fn rejects_keys_escaping_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDocumentStore::new(dir.path());

        for key in ["../outside.pdf", "/etc/passwd", "proofs/../../x", ""] {
            let err = store.put(key, vec![1]).await.unwrap_err();
            assert!(matches!(err, AppError::Storage(_)), "key {key:?}");
        }
    }
}
