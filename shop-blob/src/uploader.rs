use std::future::Future;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::{
    AssetId, AssetLocator, AssetPayload, KeyStrategy, ObjectStore, PrefixKeyStrategy,
    StoreResult, UploadConfig, UploadError, UploadResult, UploadStage,
};

/// Uploads one asset: write the bytes, then resolve the durable locator.
///
/// Both remote calls must succeed for the upload to count; no locator is
/// ever returned for a half-finished upload.
pub struct AssetUploader {
    store: Arc<dyn ObjectStore>,
    keys: Arc<dyn KeyStrategy>,
    config: UploadConfig,
}

impl AssetUploader {
    pub fn new<S: ObjectStore + 'static>(store: S, config: UploadConfig) -> Self {
        Self::from_shared(Arc::new(store), config)
    }

    /// Build on a store handle that is shared with other components
    pub fn from_shared(store: Arc<dyn ObjectStore>, config: UploadConfig) -> Self {
        Self {
            store,
            keys: Arc::new(PrefixKeyStrategy::new(config.key_prefix.clone())),
            config,
        }
    }

    /// Replace the `{prefix}/{id}` key layout
    pub fn with_key_strategy<K: KeyStrategy + 'static>(mut self, keys: K) -> Self {
        self.keys = Arc::new(keys);
        self
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Storage key an asset with this id is written to
    pub fn object_key(&self, id: &AssetId) -> String {
        self.keys.object_key(id)
    }

    #[instrument(skip(self, payload), fields(key, size = payload.len()))]
    pub async fn upload(&self, id: &AssetId, payload: &AssetPayload) -> UploadResult<AssetLocator> {
        let key = self.object_key(id);
        tracing::Span::current().record("key", key.as_str());

        if payload.len() as u64 > self.config.max_asset_bytes {
            return Err(UploadError::Rejected {
                key,
                reason: format!(
                    "asset size {} exceeds maximum {}",
                    payload.len(),
                    self.config.max_asset_bytes
                ),
            });
        }

        let put = self
            .bounded(
                UploadStage::Write,
                &key,
                self.store
                    .put(&key, Some(payload.content_type.as_str()), payload.bytes.clone()),
            )
            .await?;
        debug!(size_bytes = put.size_bytes, etag = ?put.etag, "asset written");

        let url = self
            .bounded(UploadStage::Resolve, &key, self.store.resolve_locator(&key))
            .await?;
        debug!(%url, "locator resolved");

        Ok(AssetLocator::new(url))
    }

    /// Run one remote call under the configured timeout
    async fn bounded<T, F>(&self, stage: UploadStage, key: &str, call: F) -> UploadResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        let result = match self.config.call_timeout {
            Some(after) => tokio::time::timeout(after, call).await.map_err(|_| {
                UploadError::Timeout {
                    key: key.to_string(),
                    stage,
                    after,
                }
            })?,
            None => call.await,
        };
        result.map_err(|source| UploadError::at_stage(stage, key, source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryObjectStore, StoreError};
    use std::time::Duration;

    #[tokio::test]
    async fn upload_writes_under_prefix_and_returns_locator() {
        let store = MemoryObjectStore::with_base_url("https://cdn.test");
        let uploader = AssetUploader::new(store.clone(), UploadConfig::default());
        let id = AssetId::from_string("img-1".to_string());

        let locator = uploader
            .upload(&id, &AssetPayload::jpeg(b"jpeg".to_vec()))
            .await
            .unwrap();

        assert_eq!(locator.as_str(), "https://cdn.test/products/images/img-1");
        assert_eq!(store.keys(), vec!["products/images/img-1".to_string()]);
        assert_eq!(
            store.get("products/images/img-1").unwrap().content_type.as_deref(),
            Some("image/jpeg")
        );
    }

    #[tokio::test]
    async fn write_failure_skips_locator_resolution() {
        let store = MemoryObjectStore::new();
        store.fail_puts_where(|_| true);
        let uploader = AssetUploader::new(store.clone(), UploadConfig::default());

        let err = uploader
            .upload(&AssetId::new(), &AssetPayload::jpeg(b"x".to_vec()))
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::Write { .. }));
        assert_eq!(err.stage(), Some(UploadStage::Write));
        assert_eq!(store.resolve_calls(), 0);
    }

    #[tokio::test]
    async fn resolve_failure_returns_no_locator() {
        let store = MemoryObjectStore::new();
        store.fail_resolves_where(|_| true);
        let uploader = AssetUploader::new(store.clone(), UploadConfig::default());

        let err = uploader
            .upload(&AssetId::new(), &AssetPayload::jpeg(b"x".to_vec()))
            .await
            .unwrap_err();

        match err {
            UploadError::Resolve { source, .. } => {
                assert!(matches!(source, StoreError::Unauthorized { .. }));
                assert!(!source.is_transient());
            }
            other => panic!("expected resolve failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_write_times_out() {
        let store = MemoryObjectStore::new();
        store.set_latency(|_| Duration::from_millis(200));
        let uploader = AssetUploader::new(
            store,
            UploadConfig::default().with_call_timeout(Duration::from_millis(20)),
        );

        let err = uploader
            .upload(&AssetId::new(), &AssetPayload::jpeg(b"x".to_vec()))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            UploadError::Timeout {
                stage: UploadStage::Write,
                ..
            }
        ));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn oversized_asset_is_rejected_before_any_call() {
        let store = MemoryObjectStore::new();
        let uploader = AssetUploader::new(
            store.clone(),
            UploadConfig::default().with_max_asset_bytes(2),
        );

        let err = uploader
            .upload(&AssetId::new(), &AssetPayload::jpeg(b"abc".to_vec()))
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::Rejected { .. }));
        assert_eq!(err.stage(), None);
        assert_eq!(store.put_calls(), 0);
    }
}
