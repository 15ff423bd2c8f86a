use std::{collections::HashMap, sync::Arc};

use metrics::counter;
use thiserror::Error;
use tokio::{sync::RwLock, time::timeout};
use tracing::{debug, info, warn};

use crate::application::repos::{RepoError, TenantsRepo};
use crate::domain::tenant::TenantConfig;

use super::config::SiteCacheConfig;

const SOURCE: &str = "boardfront::site_cache";

pub(crate) const METRIC_HIT: &str = "boardfront_site_cache_hit_total";
pub(crate) const METRIC_MISS: &str = "boardfront_site_cache_miss_total";
pub(crate) const METRIC_POPULATE: &str = "boardfront_site_cache_populate_total";
pub(crate) const METRIC_ERROR: &str = "boardfront_site_cache_error_total";

#[derive(Debug, Clone, Error)]
pub enum SiteCacheError {
    #[error("no tenant is configured for host `{host}`")]
    NotFound { host: String },
    #[error("tenant store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("tenant query failed: {0}")]
    QueryFailed(String),
}

impl SiteCacheError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::QueryFailed(_) => "query_failed",
        }
    }
}

impl From<RepoError> for SiteCacheError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Unavailable(message) => Self::StoreUnavailable(message),
            other => Self::QueryFailed(other.to_string()),
        }
    }
}

/// Process-wide map from normalized host to its resolved tenant.
///
/// Entries are immutable once inserted and only leave through [`SiteCache::invalidate`]
/// or [`SiteCache::clear`].
pub struct SiteCache {
    entries: RwLock<HashMap<String, Arc<TenantConfig>>>,
    store: Arc<dyn TenantsRepo>,
    config: SiteCacheConfig,
}

impl SiteCache {
    pub fn new(store: Arc<dyn TenantsRepo>, config: SiteCacheConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            store,
            config,
        }
    }

    /// Return the tenant for `host`, loading it from the store on first use.
    ///
    /// `host` must already be normalized. Lookups that fail are not remembered,
    /// so the next request for the same host queries the store again.
    pub async fn resolve(&self, host: &str) -> Result<Arc<TenantConfig>, SiteCacheError> {
        if let Some(site) = self.lookup(host).await {
            counter!(METRIC_HIT).increment(1);
            return Ok(site);
        }
        counter!(METRIC_MISS).increment(1);

        let mut entries = self.entries.write().await;

        // Another request may have populated the host while we queued for the lock.
        if let Some(site) = entries.get(host) {
            debug!(target: SOURCE, host, "tenant populated by a concurrent request");
            return Ok(Arc::clone(site));
        }

        let populated = match timeout(self.config.store_timeout, self.populate(host)).await {
            Ok(result) => result,
            Err(_) => Err(SiteCacheError::QueryFailed(format!(
                "store did not answer within {} ms",
                self.config.store_timeout.as_millis()
            ))),
        };

        let site = match populated {
            Ok(site) => Arc::new(site),
            Err(err) => {
                counter!(METRIC_ERROR, "kind" => err.kind()).increment(1);
                match &err {
                    SiteCacheError::NotFound { .. } => {
                        debug!(target: SOURCE, host, "no tenant for host");
                    }
                    _ => {
                        warn!(target: SOURCE, host, kind = err.kind(), error = %err, "tenant population failed");
                    }
                }
                return Err(err);
            }
        };

        entries.insert(host.to_string(), Arc::clone(&site));
        counter!(METRIC_POPULATE).increment(1);
        info!(
            target: SOURCE,
            host,
            ib_id = site.id,
            siblings = site.sibling_tenants.len(),
            cached = entries.len(),
            "tenant cached"
        );

        Ok(site)
    }

    async fn populate(&self, host: &str) -> Result<TenantConfig, SiteCacheError> {
        let record = self
            .store
            .find_by_domain(host)
            .await?
            .ok_or_else(|| SiteCacheError::NotFound {
                host: host.to_string(),
            })?;

        let siblings = self.store.list_siblings(record.id).await?;

        TenantConfig::assemble(host, record, siblings)
            .map_err(|err| SiteCacheError::QueryFailed(err.to_string()))
    }

    /// Cached tenant for `host`, without touching the store.
    pub async fn lookup(&self, host: &str) -> Option<Arc<TenantConfig>> {
        self.entries.read().await.get(host).cloned()
    }

    pub async fn contains(&self, host: &str) -> bool {
        self.entries.read().await.contains_key(host)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drop one host so its next request reloads it. Returns whether it was cached.
    pub async fn invalidate(&self, host: &str) -> bool {
        let removed = self.entries.write().await.remove(host).is_some();
        if removed {
            info!(target: SOURCE, host, "tenant invalidated");
        }
        removed
    }

    /// Drop every host. Returns how many entries were removed.
    pub async fn clear(&self) -> usize {
        let mut entries = self.entries.write().await;
        let count = entries.len();
        entries.clear();
        info!(target: SOURCE, removed = count, "tenant cache cleared");
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::domain::entities::{SiblingTenant, TenantRecord};
    use crate::domain::host::normalize_host;

    #[derive(Default)]
    struct FakeTenantsRepo {
        tenants: Vec<(String, TenantRecord)>,
        lookups: AtomicUsize,
        sibling_queries: AtomicUsize,
        delay: Option<Duration>,
        fail_lookup: Option<fn() -> RepoError>,
        fail_siblings: bool,
    }

    impl FakeTenantsRepo {
        fn with_tenants(domains: &[&str]) -> Self {
            let tenants = domains
                .iter()
                .enumerate()
                .map(|(index, domain)| (domain.to_string(), record(index as i32 + 1, domain)))
                .collect();
            Self {
                tenants,
                ..Default::default()
            }
        }

        fn lookups(&self) -> usize {
            self.lookups.load(Ordering::SeqCst)
        }

        fn sibling_queries(&self) -> usize {
            self.sibling_queries.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TenantsRepo for FakeTenantsRepo {
        async fn find_by_domain(&self, domain: &str) -> Result<Option<TenantRecord>, RepoError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(fail) = self.fail_lookup {
                return Err(fail());
            }
            Ok(self
                .tenants
                .iter()
                .find(|(candidate, _)| candidate == domain)
                .map(|(_, record)| record.clone()))
        }

        async fn list_siblings(&self, exclude_id: i32) -> Result<Vec<SiblingTenant>, RepoError> {
            self.sibling_queries.fetch_add(1, Ordering::SeqCst);
            if self.fail_siblings {
                return Err(RepoError::from_persistence("error decoding column 1"));
            }
            Ok(self
                .tenants
                .iter()
                .filter(|(_, record)| record.id != exclude_id)
                .map(|(domain, record)| SiblingTenant::new(record.title.clone(), domain.clone()))
                .collect())
        }
    }

    fn record(id: i32, domain: &str) -> TenantRecord {
        TenantRecord {
            id,
            title: format!("{domain} board"),
            description: "a test board".into(),
            adult: false,
            api_base: format!("api.{domain}"),
            image_base: format!("img.{domain}"),
            style_sheet: "style.css".into(),
            logo_path: "logo.png".into(),
            discord_invite_url: String::new(),
        }
    }

    fn pool_timed_out() -> RepoError {
        RepoError::unavailable("pool timed out while waiting for an open connection")
    }

    fn query_error() -> RepoError {
        RepoError::from_persistence("relation \"imageboards\" does not exist")
    }

    fn cache_over(repo: Arc<FakeTenantsRepo>) -> SiteCache {
        SiteCache::new(repo, SiteCacheConfig::default())
    }

    #[tokio::test]
    async fn first_resolve_queries_twice_then_serves_from_memory() {
        let repo = Arc::new(FakeTenantsRepo::with_tenants(&[
            "test.board",
            "other.board",
            "another.board",
        ]));
        let cache = cache_over(repo.clone());

        let first = cache.resolve("test.board").await.expect("tenant resolves");
        assert_eq!(repo.lookups(), 1);
        assert_eq!(repo.sibling_queries(), 1);
        assert_eq!(first.id, 1);
        assert_eq!(first.sibling_tenants.len(), 2);
        assert!(
            first
                .sibling_tenants
                .iter()
                .all(|sibling| sibling.address != "test.board")
        );

        let second = cache.resolve("test.board").await.expect("cached tenant");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(repo.lookups(), 1);
        assert_eq!(repo.sibling_queries(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_requests_share_one_population() {
        let repo = Arc::new(FakeTenantsRepo {
            delay: Some(Duration::from_millis(50)),
            ..FakeTenantsRepo::with_tenants(&["test.board", "other.board"])
        });
        let cache = Arc::new(cache_over(repo.clone()));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.resolve("test.board").await })
            })
            .collect();

        let mut resolved = Vec::new();
        for handle in handles {
            resolved.push(handle.await.expect("task joins").expect("tenant resolves"));
        }

        assert_eq!(repo.lookups(), 1);
        assert_eq!(repo.sibling_queries(), 1);
        assert!(resolved.iter().all(|site| Arc::ptr_eq(site, &resolved[0])));
    }

    #[tokio::test]
    async fn unknown_host_is_not_cached() {
        let repo = Arc::new(FakeTenantsRepo::with_tenants(&["test.board"]));
        let cache = cache_over(repo.clone());

        let err = cache
            .resolve("unknown.example")
            .await
            .expect_err("no tenant row");
        assert!(matches!(err, SiteCacheError::NotFound { ref host } if host == "unknown.example"));
        assert!(cache.is_empty().await);
        assert_eq!(repo.sibling_queries(), 0);

        let _ = cache.resolve("unknown.example").await;
        assert_eq!(repo.lookups(), 2);
    }

    #[tokio::test]
    async fn port_suffix_maps_to_same_entry() {
        let repo = Arc::new(FakeTenantsRepo::with_tenants(&["tenant.example"]));
        let cache = cache_over(repo.clone());

        let with_port = cache
            .resolve(normalize_host("tenant.example:8080"))
            .await
            .expect("tenant resolves");
        let without_port = cache
            .resolve(normalize_host("tenant.example"))
            .await
            .expect("tenant resolves");

        assert!(Arc::ptr_eq(&with_port, &without_port));
        assert_eq!(repo.lookups(), 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn sibling_failure_leaves_no_entry() {
        let repo = Arc::new(FakeTenantsRepo {
            fail_siblings: true,
            ..FakeTenantsRepo::with_tenants(&["test.board", "other.board"])
        });
        let cache = cache_over(repo.clone());

        let err = cache.resolve("test.board").await.expect_err("sibling query fails");
        assert!(matches!(err, SiteCacheError::QueryFailed(_)));
        assert!(!cache.contains("test.board").await);
        assert_eq!(repo.lookups(), 1);
        assert_eq!(repo.sibling_queries(), 1);
    }

    #[tokio::test]
    async fn unavailable_store_is_reported_separately() {
        let repo = Arc::new(FakeTenantsRepo {
            fail_lookup: Some(pool_timed_out),
            ..FakeTenantsRepo::with_tenants(&["test.board"])
        });
        let cache = cache_over(repo.clone());

        let err = cache.resolve("test.board").await.expect_err("store down");
        assert!(matches!(err, SiteCacheError::StoreUnavailable(_)));
        assert_eq!(err.kind(), "store_unavailable");
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn lookup_failure_is_a_query_failure() {
        let repo = Arc::new(FakeTenantsRepo {
            fail_lookup: Some(query_error),
            ..FakeTenantsRepo::with_tenants(&["test.board"])
        });
        let cache = cache_over(repo.clone());

        let err = cache.resolve("test.board").await.expect_err("query fails");
        assert!(matches!(err, SiteCacheError::QueryFailed(_)));
        assert_eq!(repo.sibling_queries(), 0);
    }

    #[tokio::test]
    async fn slow_store_times_out_and_releases_the_lock() {
        let repo = Arc::new(FakeTenantsRepo {
            delay: Some(Duration::from_millis(500)),
            ..FakeTenantsRepo::with_tenants(&["test.board"])
        });
        let cache = SiteCache::new(
            repo.clone(),
            SiteCacheConfig {
                store_timeout: Duration::from_millis(20),
            },
        );

        let err = cache.resolve("test.board").await.expect_err("store too slow");
        assert!(matches!(err, SiteCacheError::QueryFailed(ref message) if message.contains("20 ms")));

        let probe = tokio::time::timeout(Duration::from_millis(100), cache.len()).await;
        assert_eq!(probe.expect("write lock released"), 0);
    }

    #[tokio::test]
    async fn clear_forces_a_fresh_population() {
        let repo = Arc::new(FakeTenantsRepo::with_tenants(&["a.board", "b.board"]));
        let cache = cache_over(repo.clone());

        cache.resolve("a.board").await.expect("a resolves");
        cache.resolve("b.board").await.expect("b resolves");
        assert_eq!(cache.clear().await, 2);
        assert!(cache.is_empty().await);

        cache.resolve("a.board").await.expect("a resolves again");
        assert_eq!(repo.lookups(), 3);
    }

    #[tokio::test]
    async fn invalidate_drops_only_the_named_host() {
        let repo = Arc::new(FakeTenantsRepo::with_tenants(&["a.board", "b.board"]));
        let cache = cache_over(repo.clone());

        cache.resolve("a.board").await.expect("a resolves");
        cache.resolve("b.board").await.expect("b resolves");

        assert!(cache.invalidate("a.board").await);
        assert!(!cache.invalidate("a.board").await);
        assert!(!cache.contains("a.board").await);
        assert!(cache.contains("b.board").await);
    }
}
