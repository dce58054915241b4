//! Embedding provider trait definition

use async_trait::async_trait;
use std::fmt::Debug;

use super::{EmbeddingRequest, EmbeddingResponse};
use crate::domain::DomainError;

/// Trait for embedding providers (OpenAI-compatible endpoints, local models, ...)
#[async_trait]
pub trait EmbeddingProvider: Send + Sync + Debug {
    /// Generate embeddings for the given input
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, DomainError>;

    /// Get the provider name
    fn provider_name(&self) -> &'static str;

    /// Get the embedding dimensions for a model, when known
    fn dimensions(&self, model: &str) -> Option<usize>;

    /// Whether the model is known to shorten its output to a requested size
    fn supports_dimensions(&self, model: &str) -> bool;
}
