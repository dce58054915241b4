//! Schema Semantic Cache
//!
//! Reuses previously generated database schemas for prompts that mean the
//! same thing as an earlier one:
//! - Embedding-based lookup with a configurable similarity threshold
//! - Exact-match fallback when no embedding provider is available
//! - In-memory or PostgreSQL artifact storage
//! - Hit, token and cost-savings accounting
//! - Periodic TTL and capacity eviction

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use infrastructure::embedding::EmbeddingService;
use infrastructure::semantic_cache::ArtifactStoreFactory;
use infrastructure::services::{EvictionJob, EvictionPolicy, SchemaCacheService};
use tracing::info;

/// Build the cache service described by the configuration
pub async fn create_cache_service(config: &AppConfig) -> anyhow::Result<Arc<SchemaCacheService>> {
    let store = ArtifactStoreFactory::create(&config.store).await?;
    let embeddings = Arc::new(EmbeddingService::from_config(&config.embedding)?);

    let service = SchemaCacheService::with_config(store, embeddings, config.cache.clone())
        .with_pricing(config.pricing.pricing()?);

    info!(
        backend = ?config.store.backend,
        threshold = config.cache.similarity_threshold,
        "Schema cache ready"
    );

    Ok(Arc::new(service))
}

/// Build the eviction job for a service using the configured policy
pub fn create_eviction_job(service: &SchemaCacheService) -> EvictionJob {
    EvictionJob::new(
        service.artifact_store(),
        EvictionPolicy::from_config(service.config()),
    )
    .with_active_embedding(service.active_embedding_filter())
}
