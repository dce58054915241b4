//! In-memory artifact store

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::semantic_cache::{ArtifactStore, CacheEntry, ScanFilter, StoreAggregate};
use crate::domain::DomainError;

/// In-memory artifact store using linear search
///
/// Suitable for development, tests and single-process deployments.
/// Locks are only held for the duration of a map operation.
#[derive(Debug, Default)]
pub struct InMemoryArtifactStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, CacheEntry>>, DomainError> {
        self.entries
            .read()
            .map_err(|e| DomainError::internal(format!("Failed to acquire read lock: {}", e)))
    }

    fn write(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, CacheEntry>>, DomainError> {
        self.entries
            .write()
            .map_err(|e| DomainError::internal(format!("Failed to acquire write lock: {}", e)))
    }

    fn remove_where<F>(&self, predicate: F) -> Result<usize, DomainError>
    where
        F: Fn(&CacheEntry) -> bool,
    {
        let mut entries = self.write()?;
        let before = entries.len();
        entries.retain(|_, entry| !predicate(entry));

        Ok(before - entries.len())
    }
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn insert(&self, entry: CacheEntry) -> Result<(), DomainError> {
        let mut entries = self.write()?;

        if entries.contains_key(entry.id()) {
            return Err(DomainError::storage(format!(
                "Entry '{}' already exists",
                entry.id()
            )));
        }

        entries.insert(entry.id().to_string(), entry);

        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<CacheEntry>, DomainError> {
        Ok(self.read()?.get(id).cloned())
    }

    async fn scan(&self, filter: &ScanFilter) -> Result<Vec<CacheEntry>, DomainError> {
        Ok(self
            .read()?
            .values()
            .filter(|entry| filter.matches(entry))
            .cloned()
            .collect())
    }

    async fn find_by_prompt(&self, prompt: &str) -> Result<Vec<CacheEntry>, DomainError> {
        Ok(self
            .read()?
            .values()
            .filter(|entry| entry.prompt_text() == prompt)
            .cloned()
            .collect())
    }

    async fn update_hit(
        &self,
        id: &str,
        similarity: f32,
        at: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        let mut entries = self.write()?;

        match entries.get_mut(id) {
            Some(entry) => {
                entry.record_hit(similarity, at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool, DomainError> {
        Ok(self.write()?.remove(id).is_some())
    }

    async fn count(&self) -> Result<u64, DomainError> {
        Ok(self.read()?.len() as u64)
    }

    async fn aggregate(&self) -> Result<StoreAggregate, DomainError> {
        let entries = self.read()?;
        let mut aggregate = StoreAggregate::default();

        for entry in entries.values() {
            aggregate.add(entry);
        }

        Ok(aggregate)
    }

    async fn delete_created_before(&self, cutoff: DateTime<Utc>) -> Result<usize, DomainError> {
        self.remove_where(|entry| entry.created_at() < cutoff)
    }

    async fn retain_most_recent(&self, max_entries: usize) -> Result<usize, DomainError> {
        let mut entries = self.write()?;

        if entries.len() <= max_entries {
            return Ok(0);
        }

        let mut by_recency: Vec<(DateTime<Utc>, String)> = entries
            .values()
            .map(|entry| (entry.last_used_at(), entry.id().to_string()))
            .collect();

        // Most recent first; id keeps the cut deterministic on equal timestamps
        by_recency.sort_by(|a, b| b.cmp(a));

        let evicted: Vec<String> = by_recency
            .into_iter()
            .skip(max_entries)
            .map(|(_, id)| id)
            .collect();

        for id in &evicted {
            entries.remove(id);
        }

        Ok(evicted.len())
    }

    async fn delete_foreign(&self, filter: &ScanFilter) -> Result<usize, DomainError> {
        self.remove_where(|entry| entry.embedding().is_some() && !filter.matches(entry))
    }
}
