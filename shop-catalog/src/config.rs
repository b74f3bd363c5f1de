//! # Shop Configuration
//!
//! A minimal string key/value store. Values are set in code or layered in
//! from environment variables, then read through a typed snapshot.
//!
//! ## Setting and reading values
//! ```rust
//! use shop_catalog::ShopConfig;
//! let mut config = ShopConfig::new();
//!
//! config.set("upload.timeout_ms", "5000");
//! config.set("catalog.collection", "Products");
//!
//! let snapshot = config.snapshot();
//! assert_eq!(snapshot.get_u64("upload.timeout_ms"), Some(5000));
//! ```
//!
//! ## Environment overrides
//! `load_env("SHOP__")` maps `SHOP__UPLOAD__TIMEOUT_MS=2500` to
//! `upload.timeout_ms = "2500"`.
//!
//! ## Recognized keys
//! | key                      | meaning                                    |
//! |--------------------------|--------------------------------------------|
//! | `upload.key_prefix`      | storage key prefix for assets              |
//! | `upload.max_asset_bytes` | per-asset size guard                       |
//! | `upload.timeout_ms`      | per remote call timeout, `0` disables      |
//! | `upload.max_in_flight`   | cap on concurrent uploads per batch        |
//! | `catalog.collection`     | collection records are inserted into       |
//! | `catalog.timeout_ms`     | commit timeout, `0` disables               |
//! | `storage.base_url`       | locator base of the in-memory asset store  |

use std::collections::HashMap;
use std::time::Duration;

use shop_blob::UploadConfig;

/// Collection product records are inserted into by default
pub const DEFAULT_COLLECTION: &str = "Products";

#[derive(Debug, Default)]
pub struct ShopConfig {
    values: HashMap<String, String>,
}

impl ShopConfig {
    /// Create an empty config store.
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Set a configuration key to a string value.
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Layer in every environment variable starting with `prefix`.
    ///
    /// `PREFIX_A__B` becomes `a.b`; later calls override earlier values.
    pub fn load_env(&mut self, prefix: &str) {
        self.load_pairs(prefix, std::env::vars());
    }

    fn load_pairs<I>(&mut self, prefix: &str, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(prefix) {
                let normalized = stripped.to_lowercase().replace("__", ".");
                self.set(normalized, value);
            }
        }
    }

    pub fn snapshot(&self) -> ShopConfigSnapshot {
        ShopConfigSnapshot::new(self.values.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ShopConfigSnapshot {
    map: HashMap<String, String>,
}

impl ShopConfigSnapshot {
    pub(crate) fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(|s| s.as_str())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.trim().parse::<u64>().ok())
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.trim().parse::<usize>().ok())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.trim().parse::<bool>().ok())
    }

    /// Millisecond value as a timeout: `Some(None)` when set to `0`
    pub fn get_timeout_ms(&self, key: &str) -> Option<Option<Duration>> {
        self.get_u64(key)
            .map(|ms| (ms > 0).then(|| Duration::from_millis(ms)))
    }
}

/// Everything the pipeline needs, resolved from a snapshot
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub upload: UploadConfig,
    pub collection: String,
    pub commit_timeout: Option<Duration>,
    pub storage_base_url: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            upload: UploadConfig::default(),
            collection: DEFAULT_COLLECTION.to_string(),
            commit_timeout: Some(Duration::from_secs(30)),
            storage_base_url: "memory://assets".to_string(),
        }
    }
}

impl PipelineSettings {
    /// Defaults overridden by whatever keys the snapshot carries
    pub fn from_snapshot(snapshot: &ShopConfigSnapshot) -> Self {
        let mut settings = Self::default();

        if let Some(prefix) = snapshot.get_string("upload.key_prefix") {
            settings.upload = settings.upload.with_key_prefix(prefix);
        }
        if let Some(bytes) = snapshot.get_u64("upload.max_asset_bytes") {
            settings.upload = settings.upload.with_max_asset_bytes(bytes);
        }
        if let Some(timeout) = snapshot.get_timeout_ms("upload.timeout_ms") {
            settings.upload.call_timeout = timeout;
        }
        if let Some(limit) = snapshot.get_usize("upload.max_in_flight") {
            settings.upload = settings.upload.with_max_in_flight(limit);
        }
        if let Some(collection) = snapshot.get_string("catalog.collection") {
            settings.collection = collection;
        }
        if let Some(timeout) = snapshot.get_timeout_ms("catalog.timeout_ms") {
            settings.commit_timeout = timeout;
        }
        if let Some(base_url) = snapshot.get_string("storage.base_url") {
            settings.storage_base_url = base_url;
        }

        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_pairs_are_normalized_into_dotted_keys() {
        let mut config = ShopConfig::new();
        config.load_pairs(
            "SHOP__",
            vec![
                ("SHOP__UPLOAD__TIMEOUT_MS".to_string(), "2500".to_string()),
                ("SHOP__CATALOG__COLLECTION".to_string(), "Drafts".to_string()),
                ("OTHER__UPLOAD__TIMEOUT_MS".to_string(), "1".to_string()),
            ],
        );

        assert_eq!(config.get("upload.timeout_ms"), Some("2500"));
        assert_eq!(config.get("catalog.collection"), Some("Drafts"));
        assert!(!config.has("other.upload.timeout_ms"));
    }

    #[test]
    fn settings_default_when_snapshot_is_empty() {
        let settings = PipelineSettings::from_snapshot(&ShopConfig::new().snapshot());
        assert_eq!(settings.collection, "Products");
        assert_eq!(settings.upload.key_prefix, "products/images");
        assert_eq!(settings.commit_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn settings_pick_up_overrides() {
        let mut config = ShopConfig::new();
        config.set("upload.timeout_ms", "0");
        config.set("upload.max_in_flight", "4");
        config.set("upload.key_prefix", "shop/photos");
        config.set("catalog.timeout_ms", "1500");
        config.set("storage.base_url", "https://cdn.test");

        let settings = PipelineSettings::from_snapshot(&config.snapshot());

        assert_eq!(settings.upload.call_timeout, None);
        assert_eq!(settings.upload.max_in_flight, Some(4));
        assert_eq!(settings.upload.key_prefix, "shop/photos");
        assert_eq!(settings.commit_timeout, Some(Duration::from_millis(1500)));
        assert_eq!(settings.storage_base_url, "https://cdn.test");
    }

    #[test]
    fn unparsable_numbers_are_ignored() {
        let mut config = ShopConfig::new();
        config.set("upload.max_in_flight", "many");
        let snapshot = config.snapshot();
        assert_eq!(snapshot.get_usize("upload.max_in_flight"), None);
        assert_eq!(snapshot.get_bool("upload.max_in_flight"), None);
    }
}
