use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Content type the admin app produces for product photos
pub const DEFAULT_IMAGE_CONTENT_TYPE: &str = "image/jpeg";

/// Unique identifier for an uploaded asset
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetId(pub String);

impl AssetId {
    /// Generate a new random asset ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from existing string
    pub fn from_string(id: String) -> Self {
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for AssetId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Durable URL of an uploaded asset
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetLocator(String);

impl AssetLocator {
    pub fn new<S: Into<String>>(url: S) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for AssetLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// In-memory asset waiting to be uploaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPayload {
    pub bytes: Bytes,
    pub content_type: String,
}

impl AssetPayload {
    pub fn new<B: Into<Bytes>, S: Into<String>>(bytes: B, content_type: S) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.into(),
        }
    }

    /// JPEG photo, the format the admin app encodes selections to
    pub fn jpeg<B: Into<Bytes>>(bytes: B) -> Self {
        Self::new(bytes, DEFAULT_IMAGE_CONTENT_TYPE)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// One in-flight upload of a batch
#[derive(Debug, Clone)]
pub struct UploadTask {
    /// Position of the payload in the submitted batch
    pub index: usize,
    pub id: AssetId,
    pub payload: AssetPayload,
}

impl UploadTask {
    pub fn new(index: usize, payload: AssetPayload) -> Self {
        Self {
            index,
            id: AssetId::new(),
            payload,
        }
    }
}

/// The two remote calls of an upload, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UploadStage {
    Write,
    Resolve,
}

impl std::fmt::Display for UploadStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadStage::Write => f.write_str("writing"),
            UploadStage::Resolve => f.write_str("resolving locator for"),
        }
    }
}
