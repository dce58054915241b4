//! Cache entry entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::artifact::SchemaArtifact;

/// Embedding vector tagged with the model that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEmbedding {
    model: String,
    vector: Vec<f32>,
}

impl StoredEmbedding {
    pub fn new(model: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            model: model.into(),
            vector,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn vector(&self) -> &[f32] {
        &self.vector
    }

    pub fn dimensions(&self) -> usize {
        self.vector.len()
    }

    /// Whether this embedding can be compared with a query from `model`
    /// having `dimensions` components
    pub fn is_comparable(&self, model: &str, dimensions: usize) -> bool {
        self.model == model && self.vector.len() == dimensions
    }
}

/// One previously served prompt → artifact pairing
///
/// Everything except the hit accounting is fixed at creation. A changed
/// artifact means a new entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    id: String,
    prompt_text: String,
    /// Absent when the provider was unavailable at write time
    embedding: Option<StoredEmbedding>,
    artifact: SchemaArtifact,
    tokens_used: u64,
    hit_count: u64,
    /// Sum of similarity scores recorded on hits
    similarity_total: f64,
    created_at: DateTime<Utc>,
    last_hit_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    /// Create a new entry with a fresh id
    pub fn new(
        prompt_text: impl Into<String>,
        embedding: Option<StoredEmbedding>,
        artifact: SchemaArtifact,
        tokens_used: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            prompt_text: prompt_text.into(),
            embedding,
            artifact,
            tokens_used,
            hit_count: 0,
            similarity_total: 0.0,
            created_at: Utc::now(),
            last_hit_at: None,
        }
    }

    /// Rebuild an entry from persisted columns
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: String,
        prompt_text: String,
        embedding: Option<StoredEmbedding>,
        artifact: SchemaArtifact,
        tokens_used: u64,
        hit_count: u64,
        similarity_total: f64,
        created_at: DateTime<Utc>,
        last_hit_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            prompt_text,
            embedding,
            artifact,
            tokens_used,
            hit_count,
            similarity_total,
            created_at,
            last_hit_at,
        }
    }

    /// Override the creation time
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn prompt_text(&self) -> &str {
        &self.prompt_text
    }

    pub fn embedding(&self) -> Option<&StoredEmbedding> {
        self.embedding.as_ref()
    }

    pub fn artifact(&self) -> &SchemaArtifact {
        &self.artifact
    }

    pub fn tokens_used(&self) -> u64 {
        self.tokens_used
    }

    pub fn hit_count(&self) -> u64 {
        self.hit_count
    }

    pub fn similarity_total(&self) -> f64 {
        self.similarity_total
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_hit_at(&self) -> Option<DateTime<Utc>> {
        self.last_hit_at
    }

    /// Most recent activity: last hit, or creation when never hit
    pub fn last_used_at(&self) -> DateTime<Utc> {
        self.last_hit_at.unwrap_or(self.created_at)
    }

    /// Tokens this entry has saved so far
    pub fn tokens_saved(&self) -> u64 {
        self.tokens_used.saturating_mul(self.hit_count)
    }

    /// Record a hit resolved to this entry
    pub fn record_hit(&mut self, similarity: f32, at: DateTime<Utc>) {
        self.hit_count += 1;
        self.similarity_total += similarity as f64;
        self.last_hit_at = Some(match self.last_hit_at {
            Some(previous) if previous > at => previous,
            _ => at,
        });
    }
}
