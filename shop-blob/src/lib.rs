//! # shop-blob: batch asset uploads for catalog records
//!
//! `shop-blob` uploads the images that belong to a catalog submission and
//! hands back their durable locators, all or nothing.
//!
//! ## Key Features
//!
//! - **Concurrent fan-out**: every asset of a batch uploads at once (or under a configured cap)
//! - **Single join point**: the batch settles once, after every task finished
//! - **Index-ordered results**: locators come back in submission order, not completion order
//! - **Aggregated failure**: any failed task fails the batch with the first error and a count
//! - **Storage agnostic**: any [`ObjectStore`] works; memory and S3-compatible stores ship here
//!
//! ## Quick Start
//!
//! ```rust
//! use shop_blob::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let store = MemoryObjectStore::with_base_url("https://cdn.example");
//! let uploader = AssetUploader::new(store, UploadConfig::default());
//! let coordinator = UploadCoordinator::new(uploader);
//!
//! let payloads = vec![AssetPayload::jpeg(b"front".to_vec()), AssetPayload::jpeg(b"back".to_vec())];
//! match coordinator.upload_batch(&payloads).await {
//!     UploadBatchResult::Success(locators) => assert_eq!(locators.len(), 2),
//!     UploadBatchResult::Failure(failure) => panic!("{failure}"),
//! }
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────┐
//! │ UploadCoordinator │  ← fan-out / fan-in, all-or-nothing
//! ├───────────────────┤
//! │   AssetUploader   │  ← write, then resolve locator, with timeouts
//! ├───────────────────┤
//! │    ObjectStore    │  ← storage primitives
//! └───────────────────┘
//! ```

mod config;
mod coordinator;
mod error;
mod memory_store;
mod s3_store;
pub mod store;
mod types;
mod uploader;

pub use config::UploadConfig;
pub use coordinator::{UploadBatchResult, UploadCoordinator};
pub use error::{BatchFailure, StoreError, StoreResult, UploadError, UploadResult};
pub use memory_store::{MemoryObjectStore, StoredObject};
pub use s3_store::{S3CompatibleStore, S3Config};
pub use store::{KeyStrategy, ObjectStore, PrefixKeyStrategy, PutResult};
pub use types::{
    AssetId, AssetLocator, AssetPayload, UploadStage, UploadTask, DEFAULT_IMAGE_CONTENT_TYPE,
};
pub use uploader::AssetUploader;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        AssetLocator, AssetPayload, AssetUploader, BatchFailure, MemoryObjectStore, ObjectStore,
        UploadBatchResult, UploadConfig, UploadCoordinator, UploadError,
    };
}
