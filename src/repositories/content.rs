//! Ciphertext content stores.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::ContentStore;
use crate::error::{AppError, Result};

/// Stores each envelope as `{root}/{id}.enc`.
#[derive(Clone, Debug)]
pub struct FsContentStore {
    root: PathBuf,
}

impl FsContentStore {
    /// Opens a store rooted at `root`, creating the directory if needed.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        tracing::info!("✅ Content store ready at {}", root.display());
        Ok(Self { root })
    }

    fn path_for(&self, id: Uuid) -> PathBuf {
        self.root.join(format!("{}.enc", id))
    }
}

#[async_trait]
impl ContentStore for FsContentStore {
    async fn put(&self, id: Uuid, bytes: &[u8]) -> Result<()> {
        let final_path = self.path_for(id);
        let temp_path = self.root.join(format!(".{}.{}.tmp", id, Uuid::new_v4()));

        let write = async {
            let mut file = tokio::fs::File::create(&temp_path).await?;
            file.write_all(bytes).await?;
            file.sync_all().await?;
            tokio::fs::rename(&temp_path, &final_path).await
        };

        if let Err(e) = write.await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(AppError::Io(e));
        }

        tracing::debug!("💾 Stored {} bytes for {}", bytes.len(), id);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Vec<u8>> {
        match tokio::fs::read(self.path_for(id)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(AppError::NotFound),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        match tokio::fs::remove_file(self.path_for(id)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

/// An in-memory content store.
#[derive(Clone, Default)]
pub struct MemoryContentStore {
    blobs: Arc<RwLock<HashMap<Uuid, Vec<u8>>>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of blobs stored
    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn put(&self, id: Uuid, bytes: &[u8]) -> Result<()> {
        self.blobs.write().await.insert(id, bytes.to_vec());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Vec<u8>> {
        self.blobs
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(AppError::NotFound)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.blobs.write().await.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("pqvault-content-{}", Uuid::new_v4()))
    }

    #[tokio::test]
    async fn fs_store_round_trips_and_deletes_idempotently() {
        let dir = scratch_dir();
        let store = FsContentStore::open(&dir).await.unwrap();
        let id = Uuid::new_v4();

        store.put(id, b"ciphertext").await.unwrap();
        assert_eq!(store.get(id).await.unwrap(), b"ciphertext");

        assert!(store.delete(id).await.unwrap());
        assert!(!store.delete(id).await.unwrap());
        assert!(matches!(store.get(id).await.unwrap_err(), AppError::NotFound));

        let leftovers = std::fs::read_dir(&dir).unwrap().count();
        assert_eq!(leftovers, 0);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn memory_store_reports_missing_blobs() {
        let store = MemoryContentStore::new();
        let id = Uuid::new_v4();
        assert!(matches!(store.get(id).await.unwrap_err(), AppError::NotFound));
        assert!(!store.delete(id).await.unwrap());

        store.put(id, b"x").await.unwrap();
        assert_eq!(store.len().await, 1);
    }
}
