use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument};

use crate::config::DEFAULT_COLLECTION;
use crate::{CatalogRecord, CatalogStore, CommitError, CommitResult, Document, InsertAck};

/// Persists built records into one catalog collection
#[derive(Clone)]
pub struct CatalogCommitter {
    store: Arc<dyn CatalogStore>,
    collection: String,
    timeout: Option<Duration>,
}

impl CatalogCommitter {
    pub fn new<S: CatalogStore + 'static>(store: S) -> Self {
        Self::from_shared(Arc::new(store))
    }

    pub fn from_shared(store: Arc<dyn CatalogStore>) -> Self {
        Self {
            store,
            collection: DEFAULT_COLLECTION.to_string(),
            timeout: Some(Duration::from_secs(30)),
        }
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// `None` waits on the store indefinitely
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    #[instrument(skip_all, fields(record_id = %record.id, collection = %self.collection))]
    pub async fn commit(&self, record: &CatalogRecord) -> CommitResult<InsertAck> {
        let document = encode(record)?;
        let insert = self.store.insert(&self.collection, document);

        let ack = match self.timeout {
            Some(after) => tokio::time::timeout(after, insert)
                .await
                .map_err(|_| CommitError::Timeout { after })??,
            None => insert.await?,
        };

        info!(
            document_id = %ack.document_id,
            position = ack.position,
            images = record.images.len(),
            "record committed"
        );
        Ok(ack)
    }
}

fn encode(record: &CatalogRecord) -> CommitResult<Document> {
    match serde_json::to_value(record).map_err(|source| CommitError::Encode { source })? {
        serde_json::Value::Object(document) => Ok(document),
        other => Err(CommitError::Encode {
            source: serde::ser::Error::custom(format!(
                "record encoded to a non-object value: {other}"
            )),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CatalogError, MemoryCatalogStore};
    use shop_blob::AssetLocator;

    fn record() -> CatalogRecord {
        CatalogRecord {
            id: "p-1".into(),
            name: "Linen shirt".into(),
            category: "Shirts".into(),
            price: 25,
            offer_price: Some(19.5),
            description: None,
            colors: None,
            sizes: None,
            quantity: "2".into(),
            images: vec![AssetLocator::new("https://cdn.test/a")],
        }
    }

    #[tokio::test]
    async fn commit_inserts_the_encoded_record() {
        let store = MemoryCatalogStore::new();
        let committer = CatalogCommitter::new(store.clone());

        let ack = committer.commit(&record()).await.unwrap();

        assert_eq!(ack.position, 0);
        let stored = store.documents("Products");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].document_id, ack.document_id);
        assert_eq!(stored[0].document["id"], "p-1");
        assert_eq!(stored[0].document["offerPrice"], 19.5);
        assert!(stored[0].document["description"].is_null());
    }

    #[tokio::test]
    async fn commit_uses_the_configured_collection() {
        let store = MemoryCatalogStore::new();
        let committer = CatalogCommitter::new(store.clone()).with_collection("Drafts");

        committer.commit(&record()).await.unwrap();

        assert_eq!(store.len("Drafts"), 1);
        assert_eq!(store.len("Products"), 0);
    }

    #[tokio::test]
    async fn store_failure_surfaces_as_commit_error() {
        let store = MemoryCatalogStore::new();
        store.fail_inserts_with(|| CatalogError::unavailable("offline"));
        let committer = CatalogCommitter::new(store);

        let err = committer.commit(&record()).await.unwrap_err();

        assert!(matches!(
            err,
            CommitError::Store {
                source: CatalogError::Unavailable { .. }
            }
        ));
    }

    #[tokio::test]
    async fn slow_store_times_out() {
        let store = MemoryCatalogStore::new();
        store.set_latency(Duration::from_millis(200));
        let committer =
            CatalogCommitter::new(store).with_timeout(Some(Duration::from_millis(20)));

        let err = committer.commit(&record()).await.unwrap_err();

        assert!(matches!(err, CommitError::Timeout { .. }));
    }
}
