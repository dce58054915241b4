//! Schema semantic cache service
//!
//! Serves previously generated schema artifacts for prompts that mean the
//! same thing as an earlier one. Lookups embed the prompt and rank stored
//! entries by cosine similarity; when no embedding can be produced the
//! service falls back to exact prompt matching instead of failing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::artifact::{validate_artifact, SchemaArtifact};
use crate::domain::semantic_cache::{
    most_recent, ArtifactStore, CacheEntry, CacheStats, EmbeddingStatus, LookupCounters,
    ScanFilter, SemanticCacheConfig, StoredEmbedding,
};
use crate::domain::usage::TokenPricing;
use crate::domain::DomainError;
use crate::infrastructure::embedding::EmbeddingService;
use crate::infrastructure::observability::{record_lookup, record_store, LookupOutcome};

/// How a hit was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Nearest stored embedding at or above the threshold
    Semantic,
    /// Identical prompt text
    Exact,
}

/// A resolved cache lookup
#[derive(Debug, Clone, Serialize)]
pub struct CacheHit {
    /// The entry, including the hit just recorded
    pub entry: CacheEntry,
    /// Cosine similarity, or 1.0 for exact matches
    pub similarity: f32,
    pub match_kind: MatchKind,
}

impl CacheHit {
    pub fn artifact(&self) -> &SchemaArtifact {
        self.entry.artifact()
    }
}

#[derive(Debug, Default)]
struct SessionCounters {
    lookups: AtomicU64,
    semantic_hits: AtomicU64,
    exact_hits: AtomicU64,
    misses: AtomicU64,
    fallbacks: AtomicU64,
}

impl SessionCounters {
    fn record(&self, outcome: LookupOutcome, fallback: bool) {
        self.lookups.fetch_add(1, Ordering::Relaxed);

        if fallback {
            self.fallbacks.fetch_add(1, Ordering::Relaxed);
        }

        let counter = match outcome {
            LookupOutcome::SemanticHit => &self.semantic_hits,
            LookupOutcome::ExactHit => &self.exact_hits,
            LookupOutcome::Miss => &self.misses,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> LookupCounters {
        LookupCounters {
            lookups: self.lookups.load(Ordering::Relaxed),
            semantic_hits: self.semantic_hits.load(Ordering::Relaxed),
            exact_hits: self.exact_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
        }
    }
}

/// Cache manager for generated schemas
///
/// Built once at startup and shared behind an `Arc`. Holds no locks of its
/// own; every mutation is a single store operation.
#[derive(Debug)]
pub struct SchemaCacheService {
    store: Arc<dyn ArtifactStore>,
    embeddings: Arc<EmbeddingService>,
    config: SemanticCacheConfig,
    pricing: TokenPricing,
    counters: SessionCounters,
}

impl SchemaCacheService {
    /// Create a service with default cache settings and pricing
    pub fn new(store: Arc<dyn ArtifactStore>, embeddings: Arc<EmbeddingService>) -> Self {
        Self::with_config(store, embeddings, SemanticCacheConfig::default())
    }

    /// Create a service with custom cache settings
    pub fn with_config(
        store: Arc<dyn ArtifactStore>,
        embeddings: Arc<EmbeddingService>,
        config: SemanticCacheConfig,
    ) -> Self {
        Self {
            store,
            embeddings,
            config,
            pricing: TokenPricing::default(),
            counters: SessionCounters::default(),
        }
    }

    pub fn with_pricing(mut self, pricing: TokenPricing) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn config(&self) -> &SemanticCacheConfig {
        &self.config
    }

    pub fn artifact_store(&self) -> Arc<dyn ArtifactStore> {
        Arc::clone(&self.store)
    }

    /// Filter selecting entries comparable with the active embedding model
    ///
    /// `None` when the provider is unconfigured or its output size is unknown.
    pub fn active_embedding_filter(&self) -> Option<ScanFilter> {
        self.embeddings
            .expected_dimensions()
            .map(|dims| ScanFilter::new(self.embeddings.get_model(), dims))
    }

    /// Embed a prompt within the configured time bound
    ///
    /// Any failure yields `None`; callers degrade to exact matching.
    async fn embed(&self, prompt: &str) -> Option<Vec<f32>> {
        let timeout = self.config.embedding_timeout();

        match tokio::time::timeout(timeout, self.embeddings.generate_embedding(prompt)).await {
            Ok(Ok(vector)) if !vector.is_empty() => Some(vector),
            Ok(Ok(_)) => {
                warn!("Embedding provider returned an empty vector");
                None
            }
            Ok(Err(DomainError::Unavailable { .. })) => None,
            Ok(Err(e)) => {
                warn!(error = %e, "Failed to generate embedding; using exact match");
                None
            }
            Err(_) => {
                warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    "Embedding timed out; using exact match"
                );
                None
            }
        }
    }

    /// Find a cached artifact for a prompt
    ///
    /// `threshold` overrides the configured similarity threshold and is
    /// clamped to [0, 1]. Returns `Ok(None)` on a miss; only store failures
    /// are errors.
    pub async fn find_similar(
        &self,
        prompt: &str,
        threshold: Option<f32>,
    ) -> Result<Option<CacheHit>, DomainError> {
        if prompt.trim().is_empty() {
            return Ok(None);
        }

        let threshold = threshold
            .filter(|t| !t.is_nan())
            .unwrap_or(self.config.similarity_threshold)
            .clamp(0.0, 1.0);

        let query = self.embed(prompt).await;
        let fallback = query.is_none();

        if let Some(query) = query {
            let nearest = self
                .store
                .nearest(&query, self.embeddings.get_model())
                .await?;

            match nearest {
                Some(best) if best.similarity >= threshold => {
                    let hit = self
                        .resolve_hit(best.entry, best.similarity, MatchKind::Semantic)
                        .await;
                    self.finish_lookup(LookupOutcome::SemanticHit, fallback);
                    return Ok(Some(hit));
                }
                Some(best) => {
                    debug!(
                        similarity = best.similarity,
                        threshold, "Nearest entry below threshold"
                    );
                }
                None => debug!("No comparable entries"),
            }
        }

        // Identical text is always a correct answer, even for entries
        // stored without an embedding
        let exact = most_recent(self.store.find_by_prompt(prompt).await?);

        match exact {
            Some(entry) => {
                let hit = self.resolve_hit(entry, 1.0, MatchKind::Exact).await;
                self.finish_lookup(LookupOutcome::ExactHit, fallback);
                Ok(Some(hit))
            }
            None => {
                debug!(fallback, "Schema cache miss");
                self.finish_lookup(LookupOutcome::Miss, fallback);
                Ok(None)
            }
        }
    }

    fn finish_lookup(&self, outcome: LookupOutcome, fallback: bool) {
        self.counters.record(outcome, fallback);
        record_lookup(outcome, fallback);
    }

    /// Record the hit on the store and return the updated view
    ///
    /// Accounting failures are logged; the artifact is still served.
    async fn resolve_hit(
        &self,
        mut entry: CacheEntry,
        similarity: f32,
        match_kind: MatchKind,
    ) -> CacheHit {
        let now = Utc::now();

        match self.store.update_hit(entry.id(), similarity, now).await {
            Ok(true) => entry.record_hit(similarity, now),
            Ok(false) => debug!(id = %entry.id(), "Entry removed before hit was recorded"),
            Err(e) => warn!(id = %entry.id(), error = %e, "Failed to record cache hit"),
        }

        debug!(
            id = %entry.id(),
            similarity,
            kind = ?match_kind,
            "Schema cache hit"
        );

        CacheHit {
            entry,
            similarity,
            match_kind,
        }
    }

    /// Cache a generated artifact for a prompt
    ///
    /// Rejected input persists nothing. Without an embedding the entry is
    /// still stored and serves exact-text lookups.
    pub async fn store(
        &self,
        prompt: &str,
        artifact: SchemaArtifact,
        tokens_used: u64,
    ) -> Result<CacheEntry, DomainError> {
        if prompt.trim().is_empty() {
            return Err(DomainError::validation("Prompt must not be empty"));
        }

        validate_artifact(&artifact)?;

        let embedding = self
            .embed(prompt)
            .await
            .map(|vector| StoredEmbedding::new(self.embeddings.get_model(), vector));
        let embedded = embedding.is_some();

        let entry = CacheEntry::new(prompt, embedding, artifact, tokens_used);
        self.store.insert(entry.clone()).await?;

        record_store(embedded);
        info!(
            id = %entry.id(),
            tables = entry.artifact().table_count(),
            tokens_used,
            embedded,
            "Cached schema artifact"
        );

        Ok(entry)
    }

    /// Generation cost avoided for `tokens`, in USD
    pub fn calculate_cost_savings(&self, tokens: u64) -> f64 {
        self.pricing.calculate_cost(tokens)
    }

    /// Aggregate statistics over every stored entry
    pub async fn get_stats(&self) -> Result<CacheStats, DomainError> {
        let aggregate = self.store.aggregate().await?;

        let avg_similarity = if aggregate.hits == 0 {
            0.0
        } else {
            aggregate.similarity_total / aggregate.hits as f64
        };

        Ok(CacheStats {
            total_cached: aggregate.entries,
            total_hits: aggregate.hits,
            total_tokens_saved: aggregate.tokens_saved,
            avg_similarity,
            estimated_cost_saved: self.calculate_cost_savings(aggregate.tokens_saved),
            session: self.counters.snapshot(),
        })
    }

    pub fn get_embedding_status(&self) -> EmbeddingStatus {
        let configured = self.embeddings.is_configured();

        EmbeddingStatus {
            configured,
            model: self.embeddings.get_model().to_string(),
            fallback: !configured,
        }
    }
}
