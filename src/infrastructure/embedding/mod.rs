//! Embedding provider implementations

mod http_client;
mod openai;
mod service;

pub use http_client::{HttpClient, HttpClientTrait};
pub use openai::{OpenAiEmbeddingProvider, DEFAULT_OPENAI_BASE_URL};
pub use service::EmbeddingService;

#[cfg(test)]
pub use http_client::mock::MockHttpClient;
