//! Object store contract and the in-memory backend.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::error::StoreError;

/// Metadata about a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    /// Object key, relative to the store (or tenant) root.
    pub key: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Key/value object storage.
///
/// Single-object overwrites are atomic: a reader sees either the old or the
/// new object, never a partial write. There are no multi-object
/// transactions and no conditional writes.
#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    /// Reads an object. Returns `None` if it does not exist.
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError>;

    /// Writes (or overwrites) an object.
    async fn put(&self, key: &str, data: Bytes) -> Result<(), StoreError>;

    /// Deletes an object. Deleting a missing object is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Returns object metadata without reading the content.
    async fn head(&self, key: &str) -> Result<Option<ObjectMeta>, StoreError>;

    /// Lists every object whose key starts with `prefix`, sorted by key.
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>, StoreError>;
}

/// In-memory backend. Used by tests and ephemeral runs.
#[derive(Debug, Default, Clone)]
pub struct MemoryBlobStore {
    objects: Arc<RwLock<BTreeMap<String, StoredObject>>>,
}

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    last_modified: DateTime<Utc>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects across all tenants.
    pub fn len(&self) -> usize {
        self.objects.read().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        let objects = self.objects.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(objects.get(key).map(|o| o.data.clone()))
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<(), StoreError> {
        super::validate_key(key)?;
        self.objects
            .write()
            .map_err(|_| StoreError::LockPoisoned)?
            .insert(
                key.to_string(),
                StoredObject {
                    data,
                    last_modified: Utc::now(),
                },
            );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.objects
            .write()
            .map_err(|_| StoreError::LockPoisoned)?
            .remove(key);
        Ok(())
    }

    async fn head(&self, key: &str) -> Result<Option<ObjectMeta>, StoreError> {
        let objects = self.objects.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(objects.get(key).map(|obj| ObjectMeta {
            key: key.to_string(),
            size: obj.data.len() as u64,
            last_modified: Some(obj.last_modified),
        }))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>, StoreError> {
        let objects = self.objects.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(objects
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(key, obj)| ObjectMeta {
                key: key.clone(),
                size: obj.data.len() as u64,
                last_modified: Some(obj.last_modified),
            })
            .collect())
    }
}
