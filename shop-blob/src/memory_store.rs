use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;

use crate::{ObjectStore, PutResult, StoreError, StoreResult};

/// Predicate over the payload bytes of an object
pub type BytesPredicate = Arc<dyn Fn(&[u8]) -> bool + Send + Sync>;

/// Simulated latency for a payload
pub type LatencyFn = Arc<dyn Fn(&[u8]) -> Duration + Send + Sync>;

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

#[derive(Default)]
struct Hooks {
    fail_put: Option<BytesPredicate>,
    fail_resolve: Option<BytesPredicate>,
    latency: Option<LatencyFn>,
}

struct Inner {
    base_url: String,
    objects: RwLock<HashMap<String, StoredObject>>,
    hooks: RwLock<Hooks>,
    put_calls: AtomicUsize,
    resolve_calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

/// In-process object store.
///
/// Locators are `{base_url}/{key}`. Besides serving local runs it exposes
/// hooks for driving failures and latency from tests, keyed on payload
/// bytes so the outcome of a task does not depend on scheduling.
#[derive(Clone)]
pub struct MemoryObjectStore {
    inner: Arc<Inner>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::with_base_url("memory://assets")
    }

    pub fn with_base_url<S: Into<String>>(base_url: S) -> Self {
        Self {
            inner: Arc::new(Inner {
                base_url: base_url.into().trim_end_matches('/').to_string(),
                objects: RwLock::new(HashMap::new()),
                hooks: RwLock::new(Hooks::default()),
                put_calls: AtomicUsize::new(0),
                resolve_calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                peak_in_flight: AtomicUsize::new(0),
            }),
        }
    }

    /// Fail writes whose payload matches
    pub fn fail_puts_where<F>(&self, predicate: F)
    where
        F: Fn(&[u8]) -> bool + Send + Sync + 'static,
    {
        self.inner.hooks.write().fail_put = Some(Arc::new(predicate));
    }

    /// Fail locator resolution for stored objects whose payload matches
    pub fn fail_resolves_where<F>(&self, predicate: F)
    where
        F: Fn(&[u8]) -> bool + Send + Sync + 'static,
    {
        self.inner.hooks.write().fail_resolve = Some(Arc::new(predicate));
    }

    /// Delay every write by the duration computed from its payload
    pub fn set_latency<F>(&self, latency: F)
    where
        F: Fn(&[u8]) -> Duration + Send + Sync + 'static,
    {
        self.inner.hooks.write().latency = Some(Arc::new(latency));
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.inner.objects.read().get(key).cloned()
    }

    /// Look an object up by the locator this store handed out
    pub fn get_by_locator(&self, locator: &str) -> Option<StoredObject> {
        let key = locator
            .strip_prefix(&self.inner.base_url)?
            .trim_start_matches('/');
        self.get(key)
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.inner.objects.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.inner.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn put_calls(&self) -> usize {
        self.inner.put_calls.load(Ordering::SeqCst)
    }

    pub fn resolve_calls(&self) -> usize {
        self.inner.resolve_calls.load(Ordering::SeqCst)
    }

    /// Highest number of writes observed running at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.inner.peak_in_flight.load(Ordering::SeqCst)
    }

    fn enter(&self) -> InFlightGuard<'_> {
        let now = self.inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        InFlightGuard { inner: &self.inner }
    }
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

struct InFlightGuard<'a> {
    inner: &'a Inner,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(
        &self,
        key: &str,
        content_type: Option<&str>,
        bytes: Bytes,
    ) -> StoreResult<PutResult> {
        self.inner.put_calls.fetch_add(1, Ordering::SeqCst);
        let _guard = self.enter();

        let (latency, fail) = {
            let hooks = self.inner.hooks.read();
            (
                hooks.latency.as_ref().map(|f| f(&bytes)),
                hooks.fail_put.as_ref().map_or(false, |f| f(&bytes)),
            )
        };

        if let Some(delay) = latency {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(StoreError::backend_msg(format!("simulated write failure for {}", key)));
        }

        let size_bytes = bytes.len() as u64;
        self.inner.objects.write().insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.map(str::to_string),
            },
        );

        Ok(PutResult {
            etag: None,
            size_bytes,
        })
    }

    async fn resolve_locator(&self, key: &str) -> StoreResult<String> {
        self.inner.resolve_calls.fetch_add(1, Ordering::SeqCst);

        let object = self.get(key).ok_or_else(|| StoreError::not_found(key))?;
        let fail = self
            .inner
            .hooks
            .read()
            .fail_resolve
            .as_ref()
            .map_or(false, |f| f(&object.bytes));
        if fail {
            return Err(StoreError::unauthorized(format!(
                "simulated locator failure for {}",
                key
            )));
        }

        Ok(format!("{}/{}", self.inner.base_url, key))
    }
}
