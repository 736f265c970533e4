use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::blob::{BlobStore, ObjectMeta};
use super::{validate_key, validate_prefix};
use crate::error::StoreError;

/// Tenant used when a token carries no identity.
pub const DEFAULT_TENANT: &str = "default";

/// Derives the tenant id from a bot token of the form `{id}:{secret}`.
///
/// The part before the first `:` is the tenant; an empty identity maps to
/// [`DEFAULT_TENANT`].
pub fn tenant_from_token(token: &str) -> String {
    let id = token.split(':').next().unwrap_or("").trim();
    if id.is_empty() {
        DEFAULT_TENANT.to_string()
    } else {
        id.to_string()
    }
}

/// A view of the shared [`BlobStore`] restricted to one tenant.
///
/// Every key is transparently prefixed with `{tenant}/`, and the prefix is
/// stripped from listing results. Two tenants never see each other's keys.
#[derive(Clone)]
pub struct TenantStore {
    backend: Arc<dyn BlobStore>,
    tenant: String,
    prefix: String,
}

impl TenantStore {
    pub fn new(backend: Arc<dyn BlobStore>, tenant: &str) -> Result<Self, StoreError> {
        validate_tenant(tenant)?;
        Ok(Self {
            backend,
            tenant: tenant.to_string(),
            prefix: format!("{tenant}/"),
        })
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    fn scoped(&self, key: &str) -> Result<String, StoreError> {
        validate_key(key)?;
        Ok(format!("{}{}", self.prefix, key))
    }

    pub async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        self.backend.get(&self.scoped(key)?).await
    }

    pub async fn put(&self, key: &str, data: impl Into<Bytes>) -> Result<(), StoreError> {
        self.backend.put(&self.scoped(key)?, data.into()).await
    }

    pub async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.backend.delete(&self.scoped(key)?).await
    }

    pub async fn head(&self, key: &str) -> Result<Option<ObjectMeta>, StoreError> {
        Ok(self
            .backend
            .head(&self.scoped(key)?)
            .await?
            .map(|meta| self.unscoped(meta)))
    }

    pub async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.head(key).await?.is_some())
    }

    /// Lists objects under `prefix`, or the whole tenant namespace when
    /// `prefix` is `None`. Returned keys are tenant-relative.
    pub async fn list(&self, prefix: Option<&str>) -> Result<Vec<ObjectMeta>, StoreError> {
        let prefix = prefix.unwrap_or("");
        validate_prefix(prefix)?;
        let scoped = format!("{}{}", self.prefix, prefix);
        Ok(self
            .backend
            .list(&scoped)
            .await?
            .into_iter()
            .map(|meta| self.unscoped(meta))
            .collect())
    }

    /// Reads and decodes a JSON object.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.get(key).await? {
            Some(data) => serde_json::from_slice(&data)
                .map(Some)
                .map_err(|e| StoreError::Decode {
                    key: key.to_string(),
                    source: e,
                }),
            None => Ok(None),
        }
    }

    /// Encodes and writes a JSON object.
    pub async fn put_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let data = serde_json::to_vec_pretty(value).map_err(|e| StoreError::Encode {
            key: key.to_string(),
            source: e,
        })?;
        self.put(key, data).await
    }

    fn unscoped(&self, mut meta: ObjectMeta) -> ObjectMeta {
        if let Some(stripped) = meta.key.strip_prefix(&self.prefix) {
            meta.key = stripped.to_string();
        }
        meta
    }
}

fn validate_tenant(tenant: &str) -> Result<(), StoreError> {
    let reason = if tenant.is_empty() {
        Some("tenant cannot be empty")
    } else if tenant.contains('/') || tenant.contains('\\') {
        Some("tenant cannot contain path separators")
    } else if tenant.chars().any(char::is_control) {
        Some("tenant cannot contain control characters")
    } else if !tenant
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        Some("allowed characters are a-z, A-Z, 0-9, '-' and '_'")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(StoreError::InvalidTenant {
            tenant: tenant.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}
