//! OpenAI-compatible embedding provider
//!
//! Talks to `POST {base_url}/v1/embeddings`. Any server implementing that
//! route (Azure proxies, local inference servers) works with a custom base URL.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::HttpClientTrait;
use crate::domain::embedding::{
    Embedding, EmbeddingProvider, EmbeddingRequest, EmbeddingResponse, EmbeddingUsage,
};
use crate::domain::DomainError;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";

const PROVIDER: &str = "openai";

/// Output sizes of the hosted models; `shortenable` models accept `dimensions`
struct ModelInfo {
    name: &'static str,
    dimensions: usize,
    shortenable: bool,
}

const MODELS: &[ModelInfo] = &[
    ModelInfo {
        name: "text-embedding-3-small",
        dimensions: 1536,
        shortenable: true,
    },
    ModelInfo {
        name: "text-embedding-3-large",
        dimensions: 3072,
        shortenable: true,
    },
    ModelInfo {
        name: "text-embedding-ada-002",
        dimensions: 1536,
        shortenable: false,
    },
];

fn model_info(model: &str) -> Option<&'static ModelInfo> {
    MODELS.iter().find(|m| m.name == model)
}

#[derive(Debug, Serialize)]
struct EmbeddingsBody<'a> {
    model: &'a str,
    input: Vec<&'a str>,
    encoding_format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsReply {
    model: String,
    data: Vec<EmbeddingItem>,
    #[serde(default)]
    usage: Option<UsageReply>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct UsageReply {
    prompt_tokens: u32,
    total_tokens: u32,
}

/// Embedding provider for the OpenAI embeddings API
#[derive(Debug)]
pub struct OpenAiEmbeddingProvider<C: HttpClientTrait> {
    client: C,
    auth_header: String,
    endpoint: String,
}

impl<C: HttpClientTrait> OpenAiEmbeddingProvider<C> {
    pub fn new(client: C, api_key: impl Into<String>) -> Self {
        Self::with_base_url(client, api_key, DEFAULT_OPENAI_BASE_URL)
    }

    pub fn with_base_url(
        client: C,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into();

        Self {
            client,
            auth_header: format!("Bearer {}", api_key.into()),
            endpoint: format!("{}/v1/embeddings", base_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn body<'a>(&self, request: &'a EmbeddingRequest) -> EmbeddingsBody<'a> {
        // Known fixed-size models reject the parameter; unknown models get it
        // since self-hosted servers usually ignore what they do not support
        let dimensions = request
            .dimensions()
            .filter(|_| model_info(request.model()).is_none_or(|m| m.shortenable));

        EmbeddingsBody {
            model: request.model(),
            input: request.inputs(),
            encoding_format: "float",
            dimensions,
        }
    }

    fn into_response(
        reply: EmbeddingsReply,
        expected: usize,
    ) -> Result<EmbeddingResponse, DomainError> {
        if reply.data.len() != expected {
            return Err(DomainError::provider(
                PROVIDER,
                format!(
                    "Expected {} embeddings, received {}",
                    expected,
                    reply.data.len()
                ),
            ));
        }

        let width = reply.data.first().map(|d| d.embedding.len()).unwrap_or(0);

        if reply.data.iter().any(|d| d.embedding.len() != width) {
            return Err(DomainError::provider(
                PROVIDER,
                "Embeddings in one response have different sizes",
            ));
        }

        let usage = reply
            .usage
            .map(|u| EmbeddingUsage::new(u.prompt_tokens, u.total_tokens))
            .unwrap_or_default();

        let embeddings = reply
            .data
            .into_iter()
            .map(|d| Embedding::new(d.index, d.embedding))
            .collect();

        Ok(EmbeddingResponse::new(reply.model, embeddings, usage))
    }
}

#[async_trait]
impl<C: HttpClientTrait> EmbeddingProvider for OpenAiEmbeddingProvider<C> {
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, DomainError> {
        let body = serde_json::to_value(self.body(&request)).map_err(|e| {
            DomainError::provider(PROVIDER, format!("Failed to encode request: {}", e))
        })?;

        let headers = vec![
            ("Authorization", self.auth_header.as_str()),
            ("Content-Type", "application/json"),
        ];

        let json = self.client.post_json(&self.endpoint, headers, &body).await?;

        let reply: EmbeddingsReply = serde_json::from_value(json).map_err(|e| {
            DomainError::provider(PROVIDER, format!("Failed to parse embedding response: {}", e))
        })?;

        Self::into_response(reply, request.input().len())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    fn dimensions(&self, model: &str) -> Option<usize> {
        model_info(model).map(|m| m.dimensions)
    }

    fn supports_dimensions(&self, model: &str) -> bool {
        model_info(model).is_some_and(|m| m.shortenable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::embedding::MockHttpClient;

    const ENDPOINT: &str = "https://api.openai.com/v1/embeddings";

    fn reply(vectors: &[Vec<f32>]) -> serde_json::Value {
        let data: Vec<serde_json::Value> = vectors
            .iter()
            .enumerate()
            .rev()
            .map(|(index, embedding)| {
                serde_json::json!({"object": "embedding", "index": index, "embedding": embedding})
            })
            .collect();

        serde_json::json!({
            "object": "list",
            "model": "text-embedding-3-small",
            "data": data,
            "usage": {"prompt_tokens": 12, "total_tokens": 12}
        })
    }

    #[tokio::test]
    async fn test_embed_prompt() {
        let client = MockHttpClient::new().with_response(ENDPOINT, reply(&[vec![0.5; 1536]]));
        let provider = OpenAiEmbeddingProvider::new(client, "sk-test");

        let response = provider
            .embed(EmbeddingRequest::single(
                "text-embedding-3-small",
                "orders with line items",
            ))
            .await
            .unwrap();

        assert_eq!(response.model(), "text-embedding-3-small");
        assert_eq!(response.embeddings()[0].dimensions(), 1536);
        assert_eq!(response.usage().prompt_tokens(), 12);
    }

    #[tokio::test]
    async fn test_batch_reply_reordered_by_index() {
        let client = MockHttpClient::new()
            .with_response(ENDPOINT, reply(&[vec![1.0, 0.0], vec![0.0, 1.0]]));
        let provider = OpenAiEmbeddingProvider::new(client, "sk-test");

        let response = provider
            .embed(EmbeddingRequest::batch(
                "text-embedding-3-small",
                vec!["first".into(), "second".into()],
            ))
            .await
            .unwrap();

        assert_eq!(
            response.into_ordered_vectors(),
            vec![vec![1.0, 0.0], vec![0.0, 1.0]]
        );
    }

    #[tokio::test]
    async fn test_request_body() {
        let client = MockHttpClient::new().with_response(ENDPOINT, reply(&[vec![0.1; 8], vec![0.2; 8]]));
        let provider = OpenAiEmbeddingProvider::new(client, "sk-test");

        let request =
            EmbeddingRequest::batch("text-embedding-3-small", vec!["a".into(), "b".into()])
                .with_dimensions(8);
        provider.embed(request).await.unwrap();

        assert_eq!(
            provider.client.requests()[0],
            serde_json::json!({
                "model": "text-embedding-3-small",
                "input": ["a", "b"],
                "encoding_format": "float",
                "dimensions": 8
            })
        );
    }

    #[tokio::test]
    async fn test_dimensions_omitted_for_fixed_size_model() {
        let client = MockHttpClient::new().with_response(ENDPOINT, reply(&[vec![0.1; 4]]));
        let provider = OpenAiEmbeddingProvider::new(client, "sk-test");

        let request = EmbeddingRequest::single("text-embedding-ada-002", "a").with_dimensions(4);
        provider.embed(request).await.unwrap();

        assert!(provider.client.requests()[0].get("dimensions").is_none());
    }

    #[tokio::test]
    async fn test_count_mismatch_is_an_error() {
        let client = MockHttpClient::new().with_response(ENDPOINT, reply(&[vec![0.1; 8]]));
        let provider = OpenAiEmbeddingProvider::new(client, "sk-test");

        let request =
            EmbeddingRequest::batch("text-embedding-3-small", vec!["a".into(), "b".into()]);
        let err = provider.embed(request).await.unwrap_err();

        assert!(err.to_string().contains("Expected 2 embeddings, received 1"));
    }

    #[tokio::test]
    async fn test_ragged_reply_is_an_error() {
        let client =
            MockHttpClient::new().with_response(ENDPOINT, reply(&[vec![0.1; 8], vec![0.1; 4]]));
        let provider = OpenAiEmbeddingProvider::new(client, "sk-test");

        let request =
            EmbeddingRequest::batch("text-embedding-3-small", vec!["a".into(), "b".into()]);

        assert!(matches!(
            provider.embed(request).await,
            Err(DomainError::Provider { .. })
        ));
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let client = MockHttpClient::new().with_error(ENDPOINT, "HTTP 429: rate limited");
        let provider = OpenAiEmbeddingProvider::new(client, "sk-test");

        let err = provider
            .embed(EmbeddingRequest::single("text-embedding-3-small", "a"))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("429"));
    }

    #[test]
    fn test_custom_base_url() {
        let provider = OpenAiEmbeddingProvider::with_base_url(
            MockHttpClient::new(),
            "sk-test",
            "http://localhost:8080/",
        );

        assert_eq!(provider.endpoint(), "http://localhost:8080/v1/embeddings");
    }

    #[test]
    fn test_provider_info() {
        let provider = OpenAiEmbeddingProvider::new(MockHttpClient::new(), "sk-test");

        assert_eq!(provider.provider_name(), "openai");
        assert_eq!(provider.dimensions("text-embedding-3-large"), Some(3072));
        assert_eq!(provider.dimensions("nomic-embed-text"), None);
    }

    #[test]
    fn test_supports_dimensions_only_for_known_shortenable_models() {
        let provider = OpenAiEmbeddingProvider::new(MockHttpClient::new(), "sk-test");

        assert!(provider.supports_dimensions("text-embedding-3-small"));
        assert!(provider.supports_dimensions("text-embedding-3-large"));
        assert!(!provider.supports_dimensions("text-embedding-ada-002"));
        assert!(!provider.supports_dimensions("nomic-embed-text"));
    }
}
