use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{CatalogError, CatalogResult};

/// A catalog document: one JSON object
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Store acknowledgement of an insert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertAck {
    /// Id the store filed the document under
    pub document_id: String,
    /// Zero-based position within the collection
    pub position: u64,
}

/// Document catalog backend.
///
/// An insert either stores the whole document or nothing.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn insert(&self, collection: &str, document: Document) -> CatalogResult<InsertAck>;
}

/// Builds the error a faulted [`MemoryCatalogStore`] returns
pub type FaultFn = Arc<dyn Fn() -> CatalogError + Send + Sync>;

#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub document_id: String,
    pub document: Document,
}

#[derive(Default)]
struct MemoryInner {
    collections: RwLock<HashMap<String, Vec<StoredDocument>>>,
    fault: RwLock<Option<FaultFn>>,
    latency: RwLock<Option<Duration>>,
    insert_calls: AtomicUsize,
}

/// In-process catalog with a fault toggle for tests
#[derive(Clone, Default)]
pub struct MemoryCatalogStore {
    inner: Arc<MemoryInner>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every insert with the error `fault` builds, until cleared
    pub fn fail_inserts_with<F>(&self, fault: F)
    where
        F: Fn() -> CatalogError + Send + Sync + 'static,
    {
        *self.inner.fault.write() = Some(Arc::new(fault));
    }

    pub fn clear_fault(&self) {
        *self.inner.fault.write() = None;
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.inner.latency.write() = Some(latency);
    }

    pub fn documents(&self, collection: &str) -> Vec<StoredDocument> {
        self.inner
            .collections
            .read()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn len(&self, collection: &str) -> usize {
        self.inner
            .collections
            .read()
            .get(collection)
            .map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.collections.read().values().all(Vec::is_empty)
    }

    pub fn insert_calls(&self) -> usize {
        self.inner.insert_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn insert(&self, collection: &str, document: Document) -> CatalogResult<InsertAck> {
        self.inner.insert_calls.fetch_add(1, Ordering::SeqCst);

        let latency = *self.inner.latency.read();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let fault = self.inner.fault.read().clone();
        if let Some(fault) = fault {
            return Err(fault());
        }

        let document_id = Uuid::new_v4().to_string();
        let mut collections = self.inner.collections.write();
        let docs = collections.entry(collection.to_string()).or_default();
        docs.push(StoredDocument {
            document_id: document_id.clone(),
            document,
        });

        Ok(InsertAck {
            document_id,
            position: (docs.len() - 1) as u64,
        })
    }
}

/// Line written per inserted document
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonLine {
    pub document_id: String,
    pub document: Document,
}

/// Catalog kept as one JSON-lines file per collection, `{dir}/{collection}.jsonl`.
///
/// Each insert appends one newline-terminated line. A failed append is
/// truncated back to the previous file length, and an unterminated tail left
/// by a crash is ignored on read and cut off before the next append.
pub struct JsonFileCatalogStore {
    base_path: PathBuf,
    /// Known line counts per collection, guarded for the duration of an append
    counts: Mutex<HashMap<String, u64>>,
}

impl JsonFileCatalogStore {
    pub async fn new<P: AsRef<Path>>(base_path: P) -> CatalogResult<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&base_path).await?;
        info!(path = %base_path.display(), "file catalog initialized");

        Ok(Self {
            base_path,
            counts: Mutex::new(HashMap::new()),
        })
    }

    pub fn collection_path(&self, collection: &str) -> PathBuf {
        self.base_path.join(format!("{collection}.jsonl"))
    }

    /// Every line of a collection, in insertion order
    pub async fn read_collection(&self, collection: &str) -> CatalogResult<Vec<JsonLine>> {
        let path = self.collection_path(collection);
        let contents = match tokio::fs::read(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let complete = contents
            .iter()
            .rposition(|b| *b == b'\n')
            .map_or(0, |i| i + 1);
        if complete < contents.len() {
            warn!(path = %path.display(), "ignoring unterminated trailing line");
        }
        let text = std::str::from_utf8(&contents[..complete])
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(CatalogError::from))
            .collect()
    }

    async fn line_count(&self, collection: &str) -> CatalogResult<u64> {
        Ok(self.read_collection(collection).await?.len() as u64)
    }

    /// Cut an unterminated trailing line so the next append starts clean
    async fn drop_torn_tail(&self, path: &Path) -> CatalogResult<()> {
        let contents = match tokio::fs::read(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        let complete = contents
            .iter()
            .rposition(|b| *b == b'\n')
            .map_or(0, |i| i + 1);
        if complete < contents.len() {
            warn!(
                path = %path.display(),
                dropped_bytes = contents.len() - complete,
                "truncating torn trailing line"
            );
            let file = tokio::fs::OpenOptions::new().write(true).open(path).await?;
            file.set_len(complete as u64).await?;
        }
        Ok(())
    }
}

async fn append_line(file: &mut tokio::fs::File, line: &[u8]) -> std::io::Result<()> {
    file.write_all(line).await?;
    file.flush().await
}

fn check_collection_name(collection: &str) -> CatalogResult<()> {
    let valid = !collection.is_empty()
        && collection
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(CatalogError::backend_msg(format!(
            "invalid collection name {collection:?}"
        )))
    }
}

#[async_trait]
impl CatalogStore for JsonFileCatalogStore {
    async fn insert(&self, collection: &str, document: Document) -> CatalogResult<InsertAck> {
        check_collection_name(collection)?;

        let document_id = Uuid::new_v4().to_string();
        let mut line = serde_json::to_vec(&JsonLine {
            document_id: document_id.clone(),
            document,
        })?;
        line.push(b'\n');

        let path = self.collection_path(collection);
        let mut counts = self.counts.lock().await;
        let position = match counts.get(collection) {
            Some(count) => *count,
            None => {
                self.drop_torn_tail(&path).await?;
                self.line_count(collection).await?
            }
        };

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        let start = file.metadata().await?.len();
        if let Err(e) = append_line(&mut file, &line).await {
            if let Err(rollback) = file.set_len(start).await {
                error!(path = %path.display(), error = %rollback, "could not roll back failed append");
            }
            return Err(e.into());
        }

        counts.insert(collection.to_string(), position + 1);
        debug!(path = %path.display(), %document_id, position, "document appended");

        Ok(InsertAck {
            document_id,
            position,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(name: &str) -> Document {
        match json!({ "name": name, "price": 25 }) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn memory_store_assigns_positions_per_collection() {
        let store = MemoryCatalogStore::new();

        let first = store.insert("Products", doc("a")).await.unwrap();
        let second = store.insert("Products", doc("b")).await.unwrap();
        let other = store.insert("Drafts", doc("c")).await.unwrap();

        assert_eq!(first.position, 0);
        assert_eq!(second.position, 1);
        assert_eq!(other.position, 0);
        assert_ne!(first.document_id, second.document_id);
        assert_eq!(store.len("Products"), 2);
        assert_eq!(store.documents("Products")[1].document["name"], "b");
    }

    #[tokio::test]
    async fn memory_store_fault_rejects_without_storing() {
        let store = MemoryCatalogStore::new();
        store.fail_inserts_with(|| CatalogError::permission_denied("rules"));

        let err = store.insert("Products", doc("a")).await.unwrap_err();

        assert!(matches!(err, CatalogError::PermissionDenied { .. }));
        assert!(store.is_empty());
        assert_eq!(store.insert_calls(), 1);

        store.clear_fault();
        assert!(store.insert("Products", doc("a")).await.is_ok());
    }

    #[tokio::test]
    async fn file_store_appends_one_line_per_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileCatalogStore::new(dir.path()).await.unwrap();

        let first = store.insert("Products", doc("a")).await.unwrap();
        let second = store.insert("Products", doc("b")).await.unwrap();

        assert_eq!((first.position, second.position), (0, 1));
        let lines = store.read_collection("Products").await.unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].document_id, first.document_id);
        assert_eq!(lines[1].document["name"], "b");
    }

    #[tokio::test]
    async fn file_store_continues_positions_of_an_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = JsonFileCatalogStore::new(dir.path()).await.unwrap();
            store.insert("Products", doc("a")).await.unwrap();
        }

        let reopened = JsonFileCatalogStore::new(dir.path()).await.unwrap();
        let ack = reopened.insert("Products", doc("b")).await.unwrap();

        assert_eq!(ack.position, 1);
    }

    #[tokio::test]
    async fn file_store_recovers_from_a_torn_trailing_line() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = JsonFileCatalogStore::new(dir.path()).await.unwrap();
            store.insert("Products", doc("a")).await.unwrap();
        }
        let path = dir.path().join("Products.jsonl");
        let mut contents = std::fs::read(&path).unwrap();
        contents.extend_from_slice(br#"{"document_id":"half","docum"#);
        std::fs::write(&path, contents).unwrap();

        let reopened = JsonFileCatalogStore::new(dir.path()).await.unwrap();
        assert_eq!(reopened.read_collection("Products").await.unwrap().len(), 1);

        let ack = reopened.insert("Products", doc("b")).await.unwrap();

        assert_eq!(ack.position, 1);
        let lines = reopened.read_collection("Products").await.unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].document["name"], "b");
        assert!(std::fs::read_to_string(&path).unwrap().ends_with('\n'));
    }

    #[tokio::test]
    async fn file_store_rejects_path_like_collection_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileCatalogStore::new(dir.path()).await.unwrap();

        let err = store.insert("../Products", doc("a")).await.unwrap_err();

        assert!(matches!(err, CatalogError::Backend { .. }));
        assert!(store.read_collection("Products").await.unwrap().is_empty());
    }
}
