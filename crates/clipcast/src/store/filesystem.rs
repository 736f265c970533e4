use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use super::blob::{BlobStore, ObjectMeta};
use super::{validate_key, validate_prefix};
use crate::error::StoreError;

/// Marker embedded in in-flight temp file names. Listing skips these.
const TEMP_MARKER: &str = ".tmp-";

/// Directory-backed object store.
///
/// Each key maps to a file below `root`. Writes go to a sibling temp file
/// first and are renamed into place, so readers never observe a partially
/// written object.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        key.split('/').fold(self.root.clone(), |p, seg| p.join(seg))
    }

    fn key_for(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<&str> = rel
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<Vec<_>>>()?;
        Some(parts.join("/"))
    }

    async fn ensure_directory(&self, path: &Path) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| StoreError::Io {
                path: path.to_path_buf(),
                source: e,
            })
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn meta_from(key: String, metadata: &std::fs::Metadata) -> ObjectMeta {
    ObjectMeta {
        key,
        size: metadata.len(),
        last_modified: metadata.modified().ok().map(DateTime::<Utc>::from),
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        validate_key(key)?;
        let path = self.path_for(key);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&path, e)),
        }
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<(), StoreError> {
        validate_key(key)?;
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            self.ensure_directory(parent).await?;
        }

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("object");
        let temp_path = path.with_file_name(format!(
            "{}{}{}",
            file_name,
            TEMP_MARKER,
            uuid::Uuid::new_v4().simple()
        ));

        tokio::fs::write(&temp_path, &data)
            .await
            .map_err(|e| io_error(&temp_path, e))?;

        if let Err(e) = tokio::fs::rename(&temp_path, &path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(io_error(&path, e));
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        validate_key(key)?;
        let path = self.path_for(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(&path, e)),
        }
    }

    async fn head(&self, key: &str) -> Result<Option<ObjectMeta>, StoreError> {
        validate_key(key)?;
        let path = self.path_for(key);
        match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => Ok(Some(meta_from(key.to_string(), &metadata))),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&path, e)),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>, StoreError> {
        validate_prefix(prefix)?;

        // Only walk the deepest directory the prefix fully names.
        let start = match prefix.rfind('/') {
            Some(pos) => self.path_for(&prefix[..pos]),
            None => self.root.clone(),
        };

        let mut results = Vec::new();
        let mut pending = vec![start];
        while let Some(dir) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(io_error(&dir, e)),
            };

            while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(&dir, e))? {
                let path = entry.path();
                let metadata = entry.metadata().await.map_err(|e| io_error(&path, e))?;
                if metadata.is_dir() {
                    pending.push(path);
                    continue;
                }

                let Some(key) = self.key_for(&path) else {
                    log::warn!("Skipping non UTF-8 path {}", path.display());
                    continue;
                };
                if key.contains(TEMP_MARKER) || !key.starts_with(prefix) {
                    continue;
                }
                results.push(meta_from(key, &metadata));
            }
        }

        results.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_creates_nested_directories() {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(dir.path());

        store
            .put("tenant/jobs/abc.json", Bytes::from_static(b"{\"id\":\"abc\"}"))
            .await
            .unwrap();

        assert!(dir.path().join("tenant").join("jobs").join("abc.json").exists());
        let data = store.get("tenant/jobs/abc.json").await.unwrap().unwrap();
        assert_eq!(&data[..], b"{\"id\":\"abc\"}");
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(dir.path());
        assert!(store.get("nope.json").await.unwrap().is_none());
        assert!(store.head("nope.json").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_overwrite_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(dir.path());

        store.put("snap.json", Bytes::from_static(b"1")).await.unwrap();
        store.put("snap.json", Bytes::from_static(b"22")).await.unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["snap.json".to_string()]);
        assert_eq!(store.head("snap.json").await.unwrap().unwrap().size, 2);
    }

    #[tokio::test]
    async fn test_list_recurses_and_filters_prefix() {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(dir.path());
        for key in [
            "t1/jobs/a.json",
            "t1/jobs/b.json",
            "t1/queue/c.json",
            "t1/slot-claims/p1/2026-01-01/09_05",
            "t2/jobs/d.json",
        ] {
            store.put(key, Bytes::from_static(b"x")).await.unwrap();
        }

        let keys: Vec<String> = store
            .list("t1/")
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.key)
            .collect();
        assert_eq!(
            keys,
            vec![
                "t1/jobs/a.json",
                "t1/jobs/b.json",
                "t1/queue/c.json",
                "t1/slot-claims/p1/2026-01-01/09_05",
            ]
        );

        let jobs = store.list("t1/jobs/a").await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert!(store.list("missing/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(dir.path());
        store.put("k.json", Bytes::from_static(b"x")).await.unwrap();
        store.delete("k.json").await.unwrap();
        store.delete("k.json").await.unwrap();
        assert!(store.get("k.json").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rejects_traversal_keys() {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(dir.path());
        let err = store
            .put("../escape.json", Bytes::from_static(b"x"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey { .. }));
    }
}
