use std::time::Duration;

/// Configuration for asset uploads
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Storage key prefix; assets land under `{key_prefix}/{asset_id}`
    pub key_prefix: String,

    /// Absolute max size allowed for a single asset (safety guard)
    pub max_asset_bytes: u64,

    /// Bound on each remote call (write, then locator resolution).
    /// `None` waits forever.
    pub call_timeout: Option<Duration>,

    /// Cap on concurrently running uploads in one batch. `None` starts
    /// every task at once.
    pub max_in_flight: Option<usize>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            key_prefix: "products/images".to_string(),
            max_asset_bytes: 20 * 1024 * 1024, // 20MB
            call_timeout: Some(Duration::from_secs(30)),
            max_in_flight: None,
        }
    }
}

impl UploadConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.key_prefix = prefix.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_asset_bytes(mut self, bytes: u64) -> Self {
        self.max_asset_bytes = bytes;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Disable per-call timeouts
    pub fn without_call_timeout(mut self) -> Self {
        self.call_timeout = None;
        self
    }

    /// Bound the fan-out; zero is treated as one
    pub fn with_max_in_flight(mut self, limit: usize) -> Self {
        self.max_in_flight = Some(limit.max(1));
        self
    }
}
