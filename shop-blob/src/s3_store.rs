use std::env;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::{primitives::ByteStream as AwsByteStream, Client};
use bytes::Bytes;

use crate::{ObjectStore, PutResult, StoreError, StoreResult};

/// Connection settings for an S3-compatible bucket
#[derive(Debug, Clone)]
pub struct S3Config {
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub endpoint_url: String,
    pub bucket: String,
    /// Public base URL of the bucket; locators default to
    /// `{endpoint_url}/{bucket}/{key}` when unset
    pub public_base_url: Option<String>,
}

impl S3Config {
    /// Read `SHOP_S3_REGION`, `SHOP_S3_ACCESS_KEY_ID`,
    /// `SHOP_S3_SECRET_ACCESS_KEY`, `SHOP_S3_ENDPOINT_URL`, `SHOP_S3_BUCKET`
    /// and the optional `SHOP_S3_PUBLIC_BASE_URL`.
    pub fn from_env() -> StoreResult<Self> {
        fn get_env(key: &str) -> StoreResult<String> {
            env::var(key)
                .map_err(|_| StoreError::invalid(format!("{} environment variable required", key)))
        }

        Ok(Self {
            region: get_env("SHOP_S3_REGION")?,
            access_key_id: get_env("SHOP_S3_ACCESS_KEY_ID")?,
            secret_access_key: get_env("SHOP_S3_SECRET_ACCESS_KEY")?,
            endpoint_url: get_env("SHOP_S3_ENDPOINT_URL")?,
            bucket: get_env("SHOP_S3_BUCKET")?,
            public_base_url: env::var("SHOP_S3_PUBLIC_BASE_URL").ok(),
        })
    }

    fn locator_base(&self) -> String {
        match &self.public_base_url {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => format!("{}/{}", self.endpoint_url.trim_end_matches('/'), self.bucket),
        }
    }
}

/// Object store backed by any S3-compatible service (AWS, MinIO, RustFS)
#[derive(Clone)]
pub struct S3CompatibleStore {
    client: Client,
    bucket: String,
    locator_base: String,
}

impl S3CompatibleStore {
    pub async fn new(config: S3Config) -> Self {
        let locator_base = config.locator_base();
        let bucket = config.bucket.clone();
        let client = Self::create_client(config).await;
        Self {
            client,
            bucket,
            locator_base,
        }
    }

    pub async fn from_env() -> StoreResult<Self> {
        Ok(Self::new(S3Config::from_env()?).await)
    }

    async fn create_client(config: S3Config) -> Client {
        let credentials = Credentials::new(
            config.access_key_id,
            config.secret_access_key,
            None,
            None,
            "shop-blob",
        );

        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .endpoint_url(config.endpoint_url)
            .load()
            .await;

        Client::from_conf(
            aws_sdk_s3::config::Builder::from(&aws_config)
                .force_path_style(true)
                .build(),
        )
    }

    fn map_aws_error(err: impl std::error::Error + Send + Sync + 'static) -> StoreError {
        StoreError::backend(err)
    }
}

#[async_trait]
impl ObjectStore for S3CompatibleStore {
    async fn put(
        &self,
        key: &str,
        content_type: Option<&str>,
        bytes: Bytes,
    ) -> StoreResult<PutResult> {
        let size_bytes = bytes.len() as u64;

        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(AwsByteStream::from(bytes));

        if let Some(ct) = content_type {
            request = request.content_type(ct);
        }

        let result = request.send().await.map_err(Self::map_aws_error)?;

        Ok(PutResult {
            etag: result.e_tag,
            size_bytes,
        })
    }

    async fn resolve_locator(&self, key: &str) -> StoreResult<String> {
        // The object must be readable before its URL is handed out.
        self.client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(Self::map_aws_error)?;

        Ok(format!("{}/{}", self.locator_base, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(public: Option<&str>) -> S3Config {
        S3Config {
            region: "us-east-1".to_string(),
            access_key_id: "id".to_string(),
            secret_access_key: "secret".to_string(),
            endpoint_url: "http://localhost:9000/".to_string(),
            bucket: "shop".to_string(),
            public_base_url: public.map(str::to_string),
        }
    }

    #[test]
    fn locator_base_defaults_to_path_style_url() {
        assert_eq!(config(None).locator_base(), "http://localhost:9000/shop");
    }

    #[test]
    fn locator_base_prefers_public_url() {
        assert_eq!(
            config(Some("https://cdn.shop.test/")).locator_base(),
            "https://cdn.shop.test"
        );
    }
}
