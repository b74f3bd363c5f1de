use std::time::Duration;

use thiserror::Error;

use crate::{AssetLocator, UploadStage};

/// Result type for object store calls
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for a single asset upload
pub type UploadResult<T> = Result<T, UploadError>;

/// Errors reported by an object storage backend
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Object not found: {key}")]
    NotFound { key: String },

    #[error("Access denied: {message}")]
    Unauthorized { message: String },

    #[error("Quota exceeded: {message}")]
    QuotaExceeded { message: String },

    #[error("Invalid request: {message}")]
    Invalid { message: String },

    #[error("Storage backend error: {source}")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl StoreError {
    /// Create a backend error from any error type
    pub fn backend<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            source: Box::new(error),
        }
    }

    /// Create a backend error from a plain message
    pub fn backend_msg<S: Into<String>>(message: S) -> Self {
        let message: String = message.into();
        Self::Backend {
            source: message.into(),
        }
    }

    pub fn not_found<S: Into<String>>(key: S) -> Self {
        Self::NotFound { key: key.into() }
    }

    pub fn unauthorized<S: Into<String>>(message: S) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    pub fn quota_exceeded<S: Into<String>>(message: S) -> Self {
        Self::QuotaExceeded {
            message: message.into(),
        }
    }

    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Network and quota problems may clear up on their own; auth and bad
    /// payloads will not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::QuotaExceeded { .. } | Self::Backend { .. } | Self::Io { .. }
        )
    }
}

/// Failure of one upload task
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Writing {key} failed: {source}")]
    Write {
        key: String,
        #[source]
        source: StoreError,
    },

    #[error("Resolving locator for {key} failed: {source}")]
    Resolve {
        key: String,
        #[source]
        source: StoreError,
    },

    #[error("Timed out after {after:?} while {stage} {key}")]
    Timeout {
        key: String,
        stage: UploadStage,
        after: Duration,
    },

    #[error("Rejected {key}: {reason}")]
    Rejected { key: String, reason: String },
}

impl UploadError {
    pub(crate) fn at_stage(stage: UploadStage, key: &str, source: StoreError) -> Self {
        match stage {
            UploadStage::Write => Self::Write {
                key: key.to_string(),
                source,
            },
            UploadStage::Resolve => Self::Resolve {
                key: key.to_string(),
                source,
            },
        }
    }

    /// Storage key the failed task was writing to
    pub fn key(&self) -> &str {
        match self {
            Self::Write { key, .. }
            | Self::Resolve { key, .. }
            | Self::Timeout { key, .. }
            | Self::Rejected { key, .. } => key,
        }
    }

    /// Stage the task had reached, `None` when it never left the gate
    pub fn stage(&self) -> Option<UploadStage> {
        match self {
            Self::Write { .. } => Some(UploadStage::Write),
            Self::Resolve { .. } => Some(UploadStage::Resolve),
            Self::Timeout { stage, .. } => Some(*stage),
            Self::Rejected { .. } => None,
        }
    }

    pub fn is_transient(&self) -> bool {
        match self {
            Self::Write { source, .. } | Self::Resolve { source, .. } => source.is_transient(),
            Self::Timeout { .. } => true,
            Self::Rejected { .. } => false,
        }
    }
}

/// Aggregated failure of a batch: at least one task failed.
#[derive(Error, Debug)]
#[error("{failure_count} of {batch_size} uploads failed; first failure at index {index}: {first}")]
pub struct BatchFailure {
    /// Lowest task index that failed
    pub index: usize,
    /// Error of the task at `index`
    pub first: UploadError,
    pub failure_count: usize,
    pub batch_size: usize,
    /// Locators of sibling tasks that succeeded; they stay in storage
    pub discarded: Vec<AssetLocator>,
}
