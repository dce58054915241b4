//! Periodic cache eviction
//!
//! Runs independently of the cache service and only talks to the store.
//! A lookup racing with eviction either sees the entry or does not.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::domain::semantic_cache::{ArtifactStore, ScanFilter, SemanticCacheConfig};
use crate::domain::DomainError;
use crate::infrastructure::observability::{record_eviction, EvictionReason};

/// What the eviction job removes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvictionPolicy {
    /// Entries older than this are deleted
    pub ttl: Option<Duration>,
    /// Least recently used entries beyond this count are deleted
    pub max_entries: Option<usize>,
    /// Delete entries embedded by another model or at another size
    pub purge_foreign: bool,
}

impl EvictionPolicy {
    pub fn from_config(config: &SemanticCacheConfig) -> Self {
        Self {
            ttl: config.ttl(),
            max_entries: config.capacity(),
            purge_foreign: config.purge_foreign,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    pub fn with_purge_foreign(mut self, purge: bool) -> Self {
        self.purge_foreign = purge;
        self
    }
}

/// Entries removed by one eviction pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EvictionReport {
    pub expired: usize,
    pub over_capacity: usize,
    pub foreign: usize,
}

impl EvictionReport {
    pub fn total(&self) -> usize {
        self.expired + self.over_capacity + self.foreign
    }
}

#[derive(Debug, Clone)]
pub struct EvictionJob {
    store: Arc<dyn ArtifactStore>,
    policy: EvictionPolicy,
    active: Option<ScanFilter>,
}

impl EvictionJob {
    pub fn new(store: Arc<dyn ArtifactStore>, policy: EvictionPolicy) -> Self {
        Self {
            store,
            policy,
            active: None,
        }
    }

    /// Model and size of the embeddings currently produced
    ///
    /// Required for purging foreign entries.
    pub fn with_active_embedding(mut self, filter: Option<ScanFilter>) -> Self {
        self.active = filter;
        self
    }

    pub fn policy(&self) -> &EvictionPolicy {
        &self.policy
    }

    /// Run one pass: expire, purge foreign entries, then trim to capacity
    pub async fn run_once(&self) -> Result<EvictionReport, DomainError> {
        let mut report = EvictionReport::default();

        if let Some(ttl) = self.policy.ttl {
            let ttl = chrono::Duration::from_std(ttl)
                .map_err(|e| DomainError::configuration(format!("Invalid TTL: {}", e)))?;
            match Utc::now().checked_sub_signed(ttl) {
                Some(cutoff) => {
                    report.expired = self.store.delete_created_before(cutoff).await?;
                    record_eviction(EvictionReason::Expired, report.expired);
                }
                // Nothing can be older than the earliest representable time
                None => debug!("TTL reaches past the earliest representable time, nothing expired"),
            }
        }

        if self.policy.purge_foreign {
            match &self.active {
                Some(filter) => {
                    report.foreign = self.store.delete_foreign(filter).await?;
                    record_eviction(EvictionReason::Foreign, report.foreign);
                }
                None => warn!("Foreign purge skipped: active embedding model unknown"),
            }
        }

        if let Some(max_entries) = self.policy.max_entries {
            report.over_capacity = self.store.retain_most_recent(max_entries).await?;
            record_eviction(EvictionReason::OverCapacity, report.over_capacity);
        }

        if report.total() > 0 {
            info!(
                expired = report.expired,
                over_capacity = report.over_capacity,
                foreign = report.foreign,
                "Evicted cache entries"
            );
        } else {
            debug!("Eviction pass removed nothing");
        }

        Ok(report)
    }

    /// Run on a fixed interval until the task is aborted
    pub fn spawn(self, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                if let Err(e) = self.run_once().await {
                    error!(error = %e, "Eviction pass failed");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::artifact::fixtures::blog_artifact;
    use crate::domain::semantic_cache::{CacheEntry, StoredEmbedding};
    use crate::infrastructure::semantic_cache::InMemoryArtifactStore;

    fn entry(prompt: &str, age: chrono::Duration) -> CacheEntry {
        CacheEntry::new(
            prompt,
            Some(StoredEmbedding::new("m", vec![1.0, 0.0])),
            blog_artifact(),
            10,
        )
        .with_created_at(Utc::now() - age)
    }

    #[test]
    fn test_policy_from_config() {
        let config = SemanticCacheConfig::default()
            .with_max_entries(0)
            .with_ttl(Duration::from_secs(60))
            .with_purge_foreign(true);

        let policy = EvictionPolicy::from_config(&config);

        assert_eq!(policy.ttl, Some(Duration::from_secs(60)));
        assert_eq!(policy.max_entries, None);
        assert!(policy.purge_foreign);
    }

    #[tokio::test]
    async fn test_empty_policy_removes_nothing() {
        let store = Arc::new(InMemoryArtifactStore::new());
        store.insert(entry("old", chrono::Duration::days(400))).await.unwrap();

        let report = EvictionJob::new(store.clone(), EvictionPolicy::default())
            .run_once()
            .await
            .unwrap();

        assert_eq!(report, EvictionReport::default());
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_ttl_expires_old_entries() {
        let store = Arc::new(InMemoryArtifactStore::new());
        store.insert(entry("old", chrono::Duration::hours(3))).await.unwrap();
        store.insert(entry("new", chrono::Duration::minutes(1))).await.unwrap();

        let policy = EvictionPolicy::default().with_ttl(Duration::from_secs(3600));
        let report = EvictionJob::new(store.clone(), policy).run_once().await.unwrap();

        assert_eq!(report.expired, 1);
        assert_eq!(store.find_by_prompt("new").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ttl_beyond_calendar_range_expires_nothing() {
        let store = Arc::new(InMemoryArtifactStore::new());
        store.insert(entry("old", chrono::Duration::days(400))).await.unwrap();

        let policy = EvictionPolicy::default().with_ttl(Duration::from_secs(10_000_000_000_000));
        let report = EvictionJob::new(store.clone(), policy).run_once().await.unwrap();

        assert_eq!(report.expired, 0);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_capacity_keeps_recently_used() {
        let store = Arc::new(InMemoryArtifactStore::new());
        for i in 0..5 {
            store
                .insert(entry(&format!("p{}", i), chrono::Duration::minutes(10 - i)))
                .await
                .unwrap();
        }
        let p0 = store.find_by_prompt("p0").await.unwrap().remove(0);
        store.update_hit(p0.id(), 1.0, Utc::now()).await.unwrap();

        let policy = EvictionPolicy::default().with_max_entries(2);
        let report = EvictionJob::new(store.clone(), policy).run_once().await.unwrap();

        assert_eq!(report.over_capacity, 3);
        assert_eq!(store.count().await.unwrap(), 2);
        assert_eq!(store.find_by_prompt("p0").await.unwrap().len(), 1);
        assert_eq!(store.find_by_prompt("p4").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_purge_foreign() {
        let store = Arc::new(InMemoryArtifactStore::new());
        store.insert(entry("ours", chrono::Duration::zero())).await.unwrap();
        store
            .insert(CacheEntry::new(
                "theirs",
                Some(StoredEmbedding::new("old-model", vec![1.0, 0.0])),
                blog_artifact(),
                10,
            ))
            .await
            .unwrap();

        let policy = EvictionPolicy::default().with_purge_foreign(true);

        let unknown = EvictionJob::new(store.clone(), policy.clone())
            .run_once()
            .await
            .unwrap();
        assert_eq!(unknown.foreign, 0);

        let report = EvictionJob::new(store.clone(), policy)
            .with_active_embedding(Some(ScanFilter::new("m", 2)))
            .run_once()
            .await
            .unwrap();

        assert_eq!(report.foreign, 1);
        assert_eq!(report.total(), 1);
        assert!(store.find_by_prompt("theirs").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_spawn_runs_periodically() {
        let store = Arc::new(InMemoryArtifactStore::new());
        for i in 0..4 {
            store.insert(entry(&format!("p{}", i), chrono::Duration::zero())).await.unwrap();
        }

        let handle = EvictionJob::new(store.clone(), EvictionPolicy::default().with_max_entries(1))
            .spawn(Duration::from_millis(10));

        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();

        assert_eq!(store.count().await.unwrap(), 1);
    }
}
