use async_trait::async_trait;
use bytes::Bytes;

use crate::{AssetId, StoreResult};

/// Object storage operations the upload pipeline depends on: one write and
/// one locator lookup per asset.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store the bytes under `key`, replacing anything already there
    async fn put(
        &self,
        key: &str,
        content_type: Option<&str>,
        bytes: Bytes,
    ) -> StoreResult<PutResult>;

    /// Durable download URL for an object written by `put`
    async fn resolve_locator(&self, key: &str) -> StoreResult<String>;
}

/// Result of a successful put operation
#[derive(Debug, Clone)]
pub struct PutResult {
    pub etag: Option<String>,
    pub size_bytes: u64,
}

/// Strategy for generating asset keys
pub trait KeyStrategy: Send + Sync {
    fn object_key(&self, id: &AssetId) -> String;
}

/// Default key strategy: `{prefix}/{asset_id}`
#[derive(Debug, Clone)]
pub struct PrefixKeyStrategy {
    prefix: String,
}

impl PrefixKeyStrategy {
    pub fn new<S: Into<String>>(prefix: S) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for PrefixKeyStrategy {
    fn default() -> Self {
        Self::new("products/images")
    }
}

impl KeyStrategy for PrefixKeyStrategy {
    fn object_key(&self, id: &AssetId) -> String {
        if self.prefix.is_empty() {
            id.to_string()
        } else {
            format!("{}/{}", self.prefix, id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_keys_live_under_products_images() {
        let id = AssetId::from_string("abc".to_string());
        assert_eq!(
            PrefixKeyStrategy::default().object_key(&id),
            "products/images/abc"
        );
    }

    #[test]
    fn empty_prefix_uses_bare_id() {
        let id = AssetId::from_string("abc".to_string());
        assert_eq!(PrefixKeyStrategy::new("").object_key(&id), "abc");
    }
}
