//! Domain layer - Core cache entities, traits and rules

pub mod artifact;
pub mod embedding;
pub mod error;
pub mod semantic_cache;
pub mod usage;

pub use artifact::{validate_artifact, ArtifactValidationError, SchemaArtifact};
pub use embedding::{EmbeddingProvider, EmbeddingRequest, EmbeddingResponse};
pub use error::DomainError;
pub use semantic_cache::{
    ArtifactStore, CacheEntry, CacheStats, EmbeddingStatus, ScanFilter, SemanticCacheConfig,
    StoredEmbedding,
};
pub use usage::TokenPricing;
