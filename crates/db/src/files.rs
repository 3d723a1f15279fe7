//! Attachment content storage.
//!
//! Metadata lives in the relational store; bytes live behind [`FileStore`]
//! keyed by the attachment's `storage_key`.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{StoreError, StoreResult};

#[async_trait]
pub trait FileStore: Send + Sync {
    async fn put_file(&self, storage_key: &str, bytes: Vec<u8>) -> StoreResult<()>;
    async fn read_file(&self, storage_key: &str) -> StoreResult<Option<Vec<u8>>>;
    /// Returns `true` if content existed and was removed.
    async fn delete_file(&self, storage_key: &str) -> StoreResult<bool>;
}

/// Stores files under a root directory on local disk.
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a key below the root, refusing anything that could escape it.
    fn path_for(&self, storage_key: &str) -> StoreResult<PathBuf> {
        let relative = Path::new(storage_key);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !safe || storage_key.is_empty() {
            return Err(StoreError::validation(format!(
                "Invalid storage key '{storage_key}'"
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn put_file(&self, storage_key: &str, bytes: Vec<u8>) -> StoreResult<()> {
        let path = self.path_for(storage_key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(storage_key, "Stored attachment content");
        Ok(())
    }

    async fn read_file(&self, storage_key: &str) -> StoreResult<Option<Vec<u8>>> {
        let path = self.path_for(storage_key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_file(&self, storage_key: &str) -> StoreResult<bool> {
        let path = self.path_for(storage_key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Keeps file content in memory. Used with the in-memory backend.
#[derive(Default)]
pub struct MemoryFileStore {
    files: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn put_file(&self, storage_key: &str, bytes: Vec<u8>) -> StoreResult<()> {
        self.files.write().await.insert(storage_key.to_string(), bytes);
        Ok(())
    }

    async fn read_file(&self, storage_key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.files.read().await.get(storage_key).cloned())
    }

    async fn delete_file(&self, storage_key: &str) -> StoreResult<bool> {
        Ok(self.files.write().await.remove(storage_key).is_some())
    }
}
