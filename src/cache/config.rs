//! Site cache configuration.

use std::time::Duration;

use crate::config::{DEFAULT_STORE_TIMEOUT_MS, SiteCacheSettings};

#[derive(Debug, Clone)]
pub struct SiteCacheConfig {
    /// Upper bound on the whole store sequence run while the write lock is held.
    pub store_timeout: Duration,
}

impl Default for SiteCacheConfig {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
        }
    }
}

impl From<&SiteCacheSettings> for SiteCacheConfig {
    fn from(settings: &SiteCacheSettings) -> Self {
        Self {
            store_timeout: settings.store_timeout,
        }
    }
}
