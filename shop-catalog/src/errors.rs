use std::time::Duration;

use thiserror::Error;

/// Result type for catalog store calls
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Result type for a record commit
pub type CommitResult<T> = Result<T, CommitError>;

/// A field value that cannot be turned into a record attribute
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {field} {value:?}: {reason}")]
pub struct ValidationError {
    /// Record attribute name, as serialized (`price`, `offerPrice`, ...)
    pub field: &'static str,
    pub value: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &'static str, value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// Errors reported by a catalog backend
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Catalog unavailable: {message}")]
    Unavailable { message: String },

    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("Quota exceeded: {message}")]
    QuotaExceeded { message: String },

    #[error("Catalog backend error: {source}")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
}

impl CatalogError {
    pub fn unavailable<S: Into<String>>(message: S) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn permission_denied<S: Into<String>>(message: S) -> Self {
        Self::PermissionDenied {
            message: message.into(),
        }
    }

    pub fn quota_exceeded<S: Into<String>>(message: S) -> Self {
        Self::QuotaExceeded {
            message: message.into(),
        }
    }

    /// Create a backend error from any error type
    pub fn backend<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            source: Box::new(error),
        }
    }

    pub fn backend_msg<S: Into<String>>(message: S) -> Self {
        let message: String = message.into();
        Self::Backend {
            source: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Unavailable { .. } | Self::QuotaExceeded { .. } | Self::Io { .. }
        )
    }
}

/// Why a built record did not land in the catalog
#[derive(Error, Debug)]
pub enum CommitError {
    #[error("catalog insert failed: {source}")]
    Store {
        #[from]
        source: CatalogError,
    },

    #[error("catalog insert timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("record could not be encoded: {source}")]
    Encode {
        #[source]
        source: serde_json::Error,
    },
}

impl CommitError {
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Store { source } => source.is_transient(),
            Self::Timeout { .. } => true,
            Self::Encode { .. } => false,
        }
    }
}
