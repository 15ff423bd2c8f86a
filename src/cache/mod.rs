//! Tenant cache keyed by normalized host.
//!
//! Every distinct host is resolved against the tenant store once, on its first
//! request, and the result is kept for the life of the process. Population is
//! serialized behind the write half of a reader/writer lock and re-checked after
//! the lock is taken, so a burst of first requests for one host costs a single
//! store round-trip.
//!
//! ```toml
//! [site_cache]
//! store_timeout_ms = 5000
//! ```

mod config;
mod site;

pub use config::SiteCacheConfig;
pub use site::{SiteCache, SiteCacheError};

pub(crate) use site::{METRIC_ERROR, METRIC_HIT, METRIC_MISS, METRIC_POPULATE};
