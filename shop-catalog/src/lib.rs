//! shop-catalog: catalog records and the submission pipeline.
//!
//! A [`PipelineController`] takes a [`ProductDraft`], uploads its assets
//! through a `shop_blob::UploadCoordinator`, builds a [`CatalogRecord`] from
//! the fields and the returned locators, and commits it with a
//! [`CatalogCommitter`]. The record only lands if every upload succeeded.

pub mod builder;
pub mod committer;
pub mod config;
pub mod errors;
pub mod events;
pub mod pipeline;
pub mod record;
pub mod store;

pub use builder::RecordBuilder;
pub use committer::CatalogCommitter;
pub use config::{PipelineSettings, ShopConfig, ShopConfigSnapshot, DEFAULT_COLLECTION};
pub use errors::{CatalogError, CatalogResult, CommitError, CommitResult, ValidationError};
pub use events::{PipelineEvent, PipelinePhase};
pub use pipeline::{PipelineController, SubmissionOutcome};
pub use record::{CatalogRecord, ProductDraft, ProductFields};
pub use store::{
    CatalogStore, Document, InsertAck, JsonFileCatalogStore, JsonLine, MemoryCatalogStore,
    StoredDocument,
};
