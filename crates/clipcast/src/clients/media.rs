use async_trait::async_trait;
use bytes::Bytes;

use super::http::{error_for_status, HttpError, TRANSFER_TIMEOUT};
use crate::publish::api::MediaFetcher;
use crate::store::{keys, TenantStore};

/// Downloads media over HTTP.
pub struct HttpMediaFetcher {
    http: reqwest::Client,
}

impl HttpMediaFetcher {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, HttpError> {
        let response = self.http.get(url).timeout(TRANSFER_TIMEOUT).send().await?;
        Ok(error_for_status(response).await?.bytes().await?)
    }
}

/// Reads `store:` URLs from the tenant store and hands every other URL to
/// an HTTP fetcher.
pub struct StoreMediaFetcher {
    store: TenantStore,
    fallback: HttpMediaFetcher,
}

impl StoreMediaFetcher {
    pub fn new(store: TenantStore, fallback: HttpMediaFetcher) -> Self {
        Self { store, fallback }
    }
}

#[async_trait]
impl MediaFetcher for StoreMediaFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, HttpError> {
        let Some(key) = keys::key_from_store_url(url) else {
            return self.fallback.fetch(url).await;
        };
        match self.store.get(key).await {
            Ok(Some(data)) => Ok(data),
            Ok(None) => Err(HttpError::Status {
                status: 404,
                body: format!("no stored object at {key}"),
            }),
            Err(e) => Err(HttpError::Network(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::store::MemoryBlobStore;

    fn fetcher() -> (StoreMediaFetcher, TenantStore) {
        let store = TenantStore::new(Arc::new(MemoryBlobStore::new()), "42").unwrap();
        let http = reqwest::Client::new();
        (StoreMediaFetcher::new(store.clone(), HttpMediaFetcher::new(http)), store)
    }

    #[tokio::test]
    async fn test_reads_store_urls_from_tenant() {
        let (fetcher, store) = fetcher();
        store.put("media/a.mp4", Bytes::from_static(b"video")).await.unwrap();

        let data = fetcher.fetch("store:media/a.mp4").await.unwrap();
        assert_eq!(&data[..], b"video");
    }

    #[tokio::test]
    async fn test_missing_store_object_is_not_found() {
        let (fetcher, _) = fetcher();
        let err = fetcher.fetch("store:media/missing.mp4").await.unwrap_err();
        assert!(matches!(err, HttpError::Status { status: 404, .. }));
        assert!(!err.is_transient());
    }
}
