//! Artifact store trait

use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::similarity::{best_match, ScoredEntry};
use super::CacheEntry;
use crate::domain::DomainError;

/// Restricts a scan to entries comparable with a query embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFilter {
    pub model: String,
    pub dimensions: usize,
}

impl ScanFilter {
    pub fn new(model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            model: model.into(),
            dimensions,
        }
    }

    pub fn matches(&self, entry: &CacheEntry) -> bool {
        entry
            .embedding()
            .is_some_and(|e| e.is_comparable(&self.model, self.dimensions))
    }
}

/// Totals over every stored entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreAggregate {
    pub entries: u64,
    pub hits: u64,
    pub tokens_saved: u64,
    pub similarity_total: f64,
}

impl StoreAggregate {
    /// Fold one entry into the totals
    pub fn add(&mut self, entry: &CacheEntry) {
        self.entries += 1;
        self.hits += entry.hit_count();
        self.tokens_saved = self.tokens_saved.saturating_add(entry.tokens_saved());
        self.similarity_total += entry.similarity_total();
    }
}

/// Durable table of cache entries
///
/// Every write is a single record; readers never observe a partial entry.
#[async_trait]
pub trait ArtifactStore: Send + Sync + Debug {
    /// Persist a new entry
    async fn insert(&self, entry: CacheEntry) -> Result<(), DomainError>;

    /// Get an entry by id
    async fn get(&self, id: &str) -> Result<Option<CacheEntry>, DomainError>;

    /// All entries comparable with the filter
    async fn scan(&self, filter: &ScanFilter) -> Result<Vec<CacheEntry>, DomainError>;

    /// Entries whose prompt text equals `prompt` exactly
    async fn find_by_prompt(&self, prompt: &str) -> Result<Vec<CacheEntry>, DomainError>;

    /// Record a hit on an entry. Returns false when the entry no longer exists.
    async fn update_hit(
        &self,
        id: &str,
        similarity: f32,
        at: DateTime<Utc>,
    ) -> Result<bool, DomainError>;

    /// Delete an entry by id
    async fn delete(&self, id: &str) -> Result<bool, DomainError>;

    /// Number of stored entries
    async fn count(&self) -> Result<u64, DomainError>;

    /// Totals used by the stats accountant
    async fn aggregate(&self) -> Result<StoreAggregate, DomainError>;

    /// Delete entries created before `cutoff`
    async fn delete_created_before(&self, cutoff: DateTime<Utc>) -> Result<usize, DomainError>;

    /// Keep the `max_entries` most recently used entries, delete the rest
    async fn retain_most_recent(&self, max_entries: usize) -> Result<usize, DomainError>;

    /// Delete entries that cannot be compared with the filter's model
    ///
    /// Entries without an embedding are kept; they still serve exact matches.
    async fn delete_foreign(&self, filter: &ScanFilter) -> Result<usize, DomainError>;

    /// Best comparable entry for a query embedding
    ///
    /// Stores backed by a vector index can override this; the default is a
    /// linear scan.
    async fn nearest(
        &self,
        query: &[f32],
        model: &str,
    ) -> Result<Option<ScoredEntry>, DomainError> {
        let candidates = self.scan(&ScanFilter::new(model, query.len())).await?;
        Ok(best_match(query, model, candidates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::artifact::fixtures::blog_artifact;
    use crate::domain::semantic_cache::StoredEmbedding;

    #[test]
    fn test_scan_filter_matches() {
        let filter = ScanFilter::new("m", 2);
        let ours = CacheEntry::new(
            "p",
            Some(StoredEmbedding::new("m", vec![1.0, 0.0])),
            blog_artifact(),
            1,
        );
        let bare = CacheEntry::new("p", None, blog_artifact(), 1);

        assert!(filter.matches(&ours));
        assert!(!filter.matches(&bare));
    }

    #[test]
    fn test_aggregate_add() {
        let mut entry = CacheEntry::new("p", None, blog_artifact(), 300);
        entry.record_hit(0.9, Utc::now());
        entry.record_hit(0.8, Utc::now());

        let mut aggregate = StoreAggregate::default();
        aggregate.add(&entry);
        aggregate.add(&CacheEntry::new("q", None, blog_artifact(), 50));

        assert_eq!(aggregate.entries, 2);
        assert_eq!(aggregate.hits, 2);
        assert_eq!(aggregate.tokens_saved, 600);
        assert!((aggregate.similarity_total - 1.7).abs() < 1e-6);
    }
}
