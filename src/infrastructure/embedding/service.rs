//! Embedding provider wrapper used by the cache
//!
//! Decides once, at construction, whether embeddings are available. An
//! unconfigured service answers every call with `DomainError::Unavailable`
//! without touching the network, which sends the cache into exact-match mode.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, info};

use super::{HttpClient, OpenAiEmbeddingProvider};
use crate::config::EmbeddingConfig;
use crate::domain::embedding::{EmbeddingProvider, EmbeddingRequest};
use crate::domain::DomainError;

enum ProviderState {
    Configured(Arc<dyn EmbeddingProvider>),
    Unconfigured,
}

impl std::fmt::Debug for ProviderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configured(provider) => f
                .debug_tuple("Configured")
                .field(&provider.provider_name())
                .finish(),
            Self::Unconfigured => write!(f, "Unconfigured"),
        }
    }
}

/// Embedding generation with a short-lived memo of recent prompts
///
/// The memo lets `store` reuse the vector computed by the lookup that
/// missed just before it.
#[derive(Debug)]
pub struct EmbeddingService {
    state: ProviderState,
    model: String,
    dimensions: Option<usize>,
    memo: Cache<String, Arc<Vec<f32>>>,
}

impl EmbeddingService {
    const DEFAULT_MEMO_TTL: Duration = Duration::from_secs(300);
    const DEFAULT_MEMO_CAPACITY: u64 = 1024;

    /// Service backed by a provider
    pub fn configured(provider: Arc<dyn EmbeddingProvider>, model: impl Into<String>) -> Self {
        Self {
            state: ProviderState::Configured(provider),
            model: model.into(),
            dimensions: None,
            memo: Self::build_memo(Self::DEFAULT_MEMO_TTL, Self::DEFAULT_MEMO_CAPACITY),
        }
    }

    /// Service without a provider; every call reports unavailability
    pub fn unconfigured(model: impl Into<String>) -> Self {
        Self {
            state: ProviderState::Unconfigured,
            model: model.into(),
            dimensions: None,
            memo: Self::build_memo(Self::DEFAULT_MEMO_TTL, Self::DEFAULT_MEMO_CAPACITY),
        }
    }

    /// Build from configuration: configured iff an API key is present
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, DomainError> {
        let service = match config.resolved_api_key() {
            Some(api_key) => {
                let client = HttpClient::with_timeout(config.request_timeout())?;
                let provider =
                    OpenAiEmbeddingProvider::with_base_url(client, api_key, &config.base_url);

                info!(
                    model = %config.model,
                    base_url = %config.base_url,
                    "Embedding provider configured"
                );

                Self::configured(Arc::new(provider), &config.model)
            }
            None => {
                info!(
                    model = %config.model,
                    "No embedding API key; cache lookups use exact-match only"
                );

                Self::unconfigured(&config.model)
            }
        };

        let service = service.with_memo(config.memo_ttl(), config.memo_capacity);

        Ok(match config.dimensions {
            Some(dims) => service.with_dimensions(dims),
            None => service,
        })
    }

    fn build_memo(ttl: Duration, capacity: u64) -> Cache<String, Arc<Vec<f32>>> {
        Cache::builder()
            .time_to_live(ttl)
            .max_capacity(capacity)
            .build()
    }

    /// Request shortened vectors from models that support it
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    /// Replace the memo settings
    pub fn with_memo(mut self, ttl: Duration, capacity: u64) -> Self {
        self.memo = Self::build_memo(ttl, capacity);
        self
    }

    pub fn is_configured(&self) -> bool {
        matches!(self.state, ProviderState::Configured(_))
    }

    /// Model identifier used to tag stored embeddings
    pub fn get_model(&self) -> &str {
        &self.model
    }

    /// Vector size produced for the active model, when it can be known up front
    ///
    /// The configured size only counts when the provider shortens output for
    /// this model; otherwise the model's native size applies.
    pub fn expected_dimensions(&self) -> Option<usize> {
        match &self.state {
            ProviderState::Configured(provider) => self
                .dimensions
                .filter(|_| provider.supports_dimensions(&self.model))
                .or_else(|| provider.dimensions(&self.model)),
            ProviderState::Unconfigured => None,
        }
    }

    fn provider(&self) -> Result<&Arc<dyn EmbeddingProvider>, DomainError> {
        match &self.state {
            ProviderState::Configured(provider) => Ok(provider),
            ProviderState::Unconfigured => Err(DomainError::unavailable(
                "Embedding provider is not configured",
            )),
        }
    }

    fn request(&self, request: EmbeddingRequest) -> EmbeddingRequest {
        match self.dimensions {
            Some(dims) => request.with_dimensions(dims),
            None => request,
        }
    }

    /// Embed one text
    pub async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, DomainError> {
        let provider = self.provider()?;

        if let Some(cached) = self.memo.get(text).await {
            debug!("Reusing memoized embedding");
            return Ok(cached.as_ref().clone());
        }

        let response = provider
            .embed(self.request(EmbeddingRequest::single(&self.model, text)))
            .await?;

        let vector = response
            .into_ordered_vectors()
            .into_iter()
            .next()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                DomainError::provider(provider.provider_name(), "No embedding returned")
            })?;

        self.memo
            .insert(text.to_string(), Arc::new(vector.clone()))
            .await;

        Ok(vector)
    }

    /// Embed several texts in one provider call, preserving input order
    pub async fn generate_batch_embeddings(
        &self,
        texts: &[String],
    ) -> Result<Vec<Vec<f32>>, DomainError> {
        let provider = self.provider()?;

        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = provider
            .embed(self.request(EmbeddingRequest::batch(&self.model, texts.to_vec())))
            .await?;

        let vectors = response.into_ordered_vectors();

        if vectors.len() != texts.len() {
            return Err(DomainError::provider(
                provider.provider_name(),
                format!(
                    "Expected {} embeddings, received {}",
                    texts.len(),
                    vectors.len()
                ),
            ));
        }

        for (text, vector) in texts.iter().zip(vectors.iter()) {
            self.memo
                .insert(text.clone(), Arc::new(vector.clone()))
                .await;
        }

        Ok(vectors)
    }
}
