use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use boardfront::application::repos::{RepoError, TenantsRepo};
use boardfront::cache::{SiteCache, SiteCacheConfig, SiteCacheError};
use boardfront::domain::entities::{SiblingTenant, TenantRecord};
use metrics_util::debugging::{DebugValue, DebuggingRecorder};

struct SingleTenant;

#[async_trait]
impl TenantsRepo for SingleTenant {
    async fn find_by_domain(&self, domain: &str) -> Result<Option<TenantRecord>, RepoError> {
        Ok((domain == "tenant.example").then(|| TenantRecord {
            id: 1,
            title: "Tenant Board".to_string(),
            description: String::new(),
            adult: false,
            api_base: "api.tenant.example".to_string(),
            image_base: "img.tenant.example".to_string(),
            style_sheet: "prim.css".to_string(),
            logo_path: "logo.png".to_string(),
            discord_invite_url: String::new(),
        }))
    }

    async fn list_siblings(&self, _exclude_id: i32) -> Result<Vec<SiblingTenant>, RepoError> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn site_cache_emits_expected_counters() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let cache = SiteCache::new(Arc::new(SingleTenant), SiteCacheConfig::default());

    cache.resolve("tenant.example").await.expect("first resolve");
    cache.resolve("tenant.example").await.expect("cached resolve");
    cache.resolve("tenant.example").await.expect("cached resolve");
    let err = cache
        .resolve("unknown.example")
        .await
        .expect_err("unknown host");
    assert!(matches!(err, SiteCacheError::NotFound { .. }));

    let counters: HashMap<String, u64> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .filter_map(|(composite_key, _, _, value)| match value {
            DebugValue::Counter(count) => {
                let key = composite_key.key();
                let labels: Vec<String> = key
                    .labels()
                    .map(|label| format!("{}={}", label.key(), label.value()))
                    .collect();
                let name = if labels.is_empty() {
                    key.name().to_string()
                } else {
                    format!("{}{{{}}}", key.name(), labels.join(","))
                };
                Some((name, count))
            }
            _ => None,
        })
        .collect();

    assert_eq!(counters.get("boardfront_site_cache_hit_total"), Some(&2));
    assert_eq!(counters.get("boardfront_site_cache_miss_total"), Some(&2));
    assert_eq!(counters.get("boardfront_site_cache_populate_total"), Some(&1));
    assert_eq!(
        counters.get("boardfront_site_cache_error_total{kind=not_found}"),
        Some(&1)
    );
}
