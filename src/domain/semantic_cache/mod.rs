//! Semantic cache domain models and traits
//!
//! Matches incoming schema prompts against previously served ones by
//! embedding similarity rather than exact text.

mod config;
mod entry;
mod repository;
mod similarity;
mod stats;

pub use config::SemanticCacheConfig;
pub use entry::{CacheEntry, StoredEmbedding};
pub use repository::{ArtifactStore, ScanFilter, StoreAggregate};
pub use similarity::{best_match, cosine_similarity, most_recent, ScoredEntry};
pub use stats::{CacheStats, EmbeddingStatus, LookupCounters};
