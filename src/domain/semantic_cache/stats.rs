//! Cache statistics and status reporting

use serde::{Deserialize, Serialize};

/// Per-process lookup counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LookupCounters {
    pub lookups: u64,
    pub semantic_hits: u64,
    pub exact_hits: u64,
    pub misses: u64,
    /// Lookups answered without a usable embedding
    pub fallbacks: u64,
}

impl LookupCounters {
    /// Fraction of lookups that hit, 0.0 when nothing was looked up
    pub fn hit_rate(&self) -> f64 {
        if self.lookups == 0 {
            return 0.0;
        }

        (self.semantic_hits + self.exact_hits) as f64 / self.lookups as f64
    }
}

/// Aggregate statistics over the cache
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_cached: u64,
    pub total_hits: u64,
    /// Sum over entries of tokens_used × hit_count
    pub total_tokens_saved: u64,
    /// Mean similarity recorded at hit time
    pub avg_similarity: f64,
    /// `total_tokens_saved` priced at the configured unit cost, in USD
    pub estimated_cost_saved: f64,
    pub session: LookupCounters,
}

/// Embedding provider status as seen by the cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingStatus {
    pub configured: bool,
    pub model: String,
    /// Lookups are served by exact-text matching only
    pub fallback: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        let counters = LookupCounters {
            lookups: 10,
            semantic_hits: 6,
            exact_hits: 2,
            misses: 2,
            fallbacks: 3,
        };

        assert!((counters.hit_rate() - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_hit_rate_no_lookups() {
        assert_eq!(LookupCounters::default().hit_rate(), 0.0);
    }

    #[test]
    fn test_empty_stats_are_zero() {
        let stats = CacheStats::default();

        assert_eq!(stats.total_cached, 0);
        assert_eq!(stats.total_hits, 0);
        assert_eq!(stats.total_tokens_saved, 0);
        assert_eq!(stats.avg_similarity, 0.0);
    }
}
