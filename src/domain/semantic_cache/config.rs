//! Semantic cache configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the schema semantic cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticCacheConfig {
    /// Minimum cosine similarity for a hit (0.0 to 1.0)
    ///
    /// Kept high so near misses regenerate instead of returning a schema
    /// for a materially different request.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Upper bound on the embedding call made by a lookup, in milliseconds
    ///
    /// Exceeding it is handled exactly like an unavailable provider.
    #[serde(default = "default_embedding_timeout_ms")]
    pub embedding_timeout_ms: u64,

    /// Maximum number of entries kept by the eviction job (0 = unbounded)
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Age after which entries are expired by the eviction job (0 = never)
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// How often the eviction job runs
    #[serde(default = "default_eviction_interval_secs")]
    pub eviction_interval_secs: u64,

    /// Whether the eviction job deletes entries written by other embedding models
    #[serde(default)]
    pub purge_foreign: bool,
}

fn default_similarity_threshold() -> f32 {
    0.85
}

fn default_embedding_timeout_ms() -> u64 {
    5000
}

fn default_max_entries() -> usize {
    10000
}

fn default_ttl_secs() -> u64 {
    30 * 24 * 3600
}

fn default_eviction_interval_secs() -> u64 {
    3600
}

impl Default for SemanticCacheConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            embedding_timeout_ms: default_embedding_timeout_ms(),
            max_entries: default_max_entries(),
            ttl_secs: default_ttl_secs(),
            eviction_interval_secs: default_eviction_interval_secs(),
            purge_foreign: false,
        }
    }
}

impl SemanticCacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// TTL as Duration, `None` when entries never expire
    pub fn ttl(&self) -> Option<Duration> {
        (self.ttl_secs > 0).then(|| Duration::from_secs(self.ttl_secs))
    }

    /// Size cap, `None` when unbounded
    pub fn capacity(&self) -> Option<usize> {
        (self.max_entries > 0).then_some(self.max_entries)
    }

    pub fn embedding_timeout(&self) -> Duration {
        Duration::from_millis(self.embedding_timeout_ms)
    }

    pub fn eviction_interval(&self) -> Duration {
        Duration::from_secs(self.eviction_interval_secs.max(1))
    }

    /// Set the similarity threshold, clamped to [0, 1]
    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn with_embedding_timeout(mut self, timeout: Duration) -> Self {
        self.embedding_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_secs = ttl.as_secs();
        self
    }

    pub fn with_purge_foreign(mut self, purge: bool) -> Self {
        self.purge_foreign = purge;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SemanticCacheConfig::default();

        assert!((config.similarity_threshold - 0.85).abs() < f32::EPSILON);
        assert_eq!(config.embedding_timeout(), Duration::from_secs(5));
        assert_eq!(config.capacity(), Some(10000));
        assert_eq!(config.ttl(), Some(Duration::from_secs(30 * 24 * 3600)));
        assert!(!config.purge_foreign);
    }

    #[test]
    fn test_config_builder() {
        let config = SemanticCacheConfig::new()
            .with_similarity_threshold(0.9)
            .with_embedding_timeout(Duration::from_millis(250))
            .with_max_entries(0)
            .with_ttl(Duration::ZERO)
            .with_purge_foreign(true);

        assert!((config.similarity_threshold - 0.9).abs() < f32::EPSILON);
        assert_eq!(config.embedding_timeout_ms, 250);
        assert_eq!(config.capacity(), None);
        assert_eq!(config.ttl(), None);
        assert!(config.purge_foreign);
    }

    #[test]
    fn test_similarity_threshold_clamped() {
        let config = SemanticCacheConfig::new().with_similarity_threshold(1.5);
        assert!((config.similarity_threshold - 1.0).abs() < f32::EPSILON);

        let config = SemanticCacheConfig::new().with_similarity_threshold(-0.5);
        assert!(config.similarity_threshold.abs() < f32::EPSILON);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: SemanticCacheConfig =
            serde_json::from_value(serde_json::json!({"similarity_threshold": 0.92})).unwrap();

        assert!((config.similarity_threshold - 0.92).abs() < 1e-6);
        assert_eq!(config.max_entries, 10000);
    }

    #[test]
    fn test_eviction_interval_never_zero() {
        let mut config = SemanticCacheConfig::default();
        config.eviction_interval_secs = 0;

        assert_eq!(config.eviction_interval(), Duration::from_secs(1));
    }
}
