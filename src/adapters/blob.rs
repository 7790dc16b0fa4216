//! Blob store implementations.
//!
//! References are flat file names of the form `<uuid><.ext>`; the extension
//! of the suggested name is kept so MIME lookup works on the reference.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::fs;
use uuid::Uuid;

use super::BlobStore;
use crate::error::{CatalogError, CatalogResult};

/// Build a fresh reference for a suggested file name
pub fn new_reference(suggested_name: Option<&str>) -> String {
    let extension = suggested_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_lowercase()))
        .unwrap_or_default();
    format!("{}{}", Uuid::new_v4(), extension)
}

/// Reject references that could escape the blob root
fn check_reference(reference: &str) -> CatalogResult<()> {
    if reference.is_empty()
        || reference.contains("..")
        || reference.contains('/')
        || reference.contains('\\')
    {
        return Err(CatalogError::Validation(format!(
            "invalid blob reference: {}",
            reference
        )));
    }
    Ok(())
}

/// Blobs as files under a root directory
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Open a blob directory, creating it if needed
    pub async fn open(root: impl Into<PathBuf>) -> CatalogResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await.map_err(|e| {
            CatalogError::StorageUnavailable(format!(
                "failed to create blob directory {}: {}",
                root.display(),
                e
            ))
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, reference: &str) -> CatalogResult<PathBuf> {
        check_reference(reference)?;
        Ok(self.root.join(reference))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn store(&self, bytes: &[u8], suggested_name: Option<&str>) -> CatalogResult<String> {
        let reference = new_reference(suggested_name);
        let path = self.path_for(&reference)?;
        fs::write(&path, bytes).await?;
        Ok(reference)
    }

    async fn load(&self, reference: &str) -> CatalogResult<Vec<u8>> {
        let path = self.path_for(reference)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(CatalogError::blob_not_found(reference))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, reference: &str) -> CatalogResult<bool> {
        let path = self.path_for(reference)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, reference: &str) -> CatalogResult<bool> {
        let path = self.path_for(reference)?;
        Ok(fs::try_exists(&path).await?)
    }
}

/// Blobs held in memory (for testing)
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs
    pub fn len(&self) -> usize {
        self.blobs.lock().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn guard(&self) -> CatalogResult<std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.blobs
            .lock()
            .map_err(|_| CatalogError::StorageUnavailable("blob map lock poisoned".into()))
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn store(&self, bytes: &[u8], suggested_name: Option<&str>) -> CatalogResult<String> {
        let reference = new_reference(suggested_name);
        self.guard()?.insert(reference.clone(), bytes.to_vec());
        Ok(reference)
    }

    async fn load(&self, reference: &str) -> CatalogResult<Vec<u8>> {
        self.guard()?
            .get(reference)
            .cloned()
            .ok_or_else(|| CatalogError::blob_not_found(reference))
    }

    async fn delete(&self, reference: &str) -> CatalogResult<bool> {
        Ok(self.guard()?.remove(reference).is_some())
    }

    async fn exists(&self, reference: &str) -> CatalogResult<bool> {
        Ok(self.guard()?.contains_key(reference))
    }
}
