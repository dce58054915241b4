use std::time::Duration;

use serde::Deserialize;

use crate::domain::semantic_cache::SemanticCacheConfig;
use crate::domain::usage::TokenPricing;
use crate::domain::DomainError;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub cache: SemanticCacheConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

/// Embedding provider settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// API key; falls back to `OPENAI_API_KEY`. Without one the provider is unconfigured.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    /// Requested vector size for models that can shorten their output
    pub dimensions: Option<usize>,
    pub request_timeout_secs: u64,
    /// How long a computed embedding stays reusable by a following store
    pub memo_ttl_secs: u64,
    pub memo_capacity: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: None,
            request_timeout_secs: 30,
            memo_ttl_secs: 300,
            memo_capacity: 1024,
        }
    }
}

impl EmbeddingConfig {
    /// Configured key, or `OPENAI_API_KEY`; blank values count as absent
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|key| !key.trim().is_empty())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn memo_ttl(&self) -> Duration {
        Duration::from_secs(self.memo_ttl_secs)
    }
}

/// Artifact store backend
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Connection URL; falls back to `DATABASE_URL`
    pub url: Option<String>,
    pub table_name: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            url: None,
            table_name: "schema_cache_entries".to_string(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 30,
            idle_timeout_secs: 600,
        }
    }
}

impl StoreConfig {
    pub fn resolved_url(&self) -> Option<String> {
        self.url
            .clone()
            .or_else(|| std::env::var("DATABASE_URL").ok())
            .filter(|url| !url.trim().is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Generation cost avoided per cached token, in USD
    pub unit_token_cost_usd: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            unit_token_cost_usd: 0.000045,
        }
    }
}

impl PricingConfig {
    /// Token pricing at nano-dollar precision
    ///
    /// Non-zero rates too small to represent are rejected.
    pub fn pricing(&self) -> Result<TokenPricing, DomainError> {
        let pricing = TokenPricing::from_usd(self.unit_token_cost_usd);

        if self.unit_token_cost_usd > 0.0 && pricing.price_per_token_nanos() == 0 {
            return Err(DomainError::configuration(format!(
                "unit_token_cost_usd {} is below the 1e-9 USD resolution",
                self.unit_token_cost_usd
            )));
        }

        Ok(pricing)
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.store.table_name, "schema_cache_entries");
        assert_eq!(config.embedding.model, "text-embedding-3-small");
        assert_eq!(config.pricing.pricing().unwrap(), TokenPricing::default());
    }

    #[test]
    fn test_deserialize_sections() {
        let config: AppConfig = serde_json::from_value(serde_json::json!({
            "logging": {"level": "debug", "format": "json"},
            "cache": {"similarity_threshold": 0.9},
            "embedding": {"api_key": "sk-1", "dimensions": 512},
            "store": {"backend": "postgres", "url": "postgres://localhost/cache"},
            "pricing": {"unit_token_cost_usd": 0.00001}
        }))
        .unwrap();

        assert_eq!(config.logging.format, LogFormat::Json);
        assert!((config.cache.similarity_threshold - 0.9).abs() < 1e-6);
        assert_eq!(config.embedding.resolved_api_key(), Some("sk-1".to_string()));
        assert_eq!(config.embedding.dimensions, Some(512));
        assert_eq!(config.embedding.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.store.backend, StoreBackend::Postgres);
        assert_eq!(
            config.store.resolved_url(),
            Some("postgres://localhost/cache".to_string())
        );
        assert_eq!(config.pricing.pricing().unwrap().price_per_token_nanos(), 10_000);
    }

    #[test]
    fn test_pricing_rejects_unrepresentable_rate() {
        let tiny = PricingConfig {
            unit_token_cost_usd: 0.0000000001,
        };
        assert!(matches!(
            tiny.pricing(),
            Err(DomainError::Configuration { .. })
        ));

        let free = PricingConfig {
            unit_token_cost_usd: 0.0,
        };
        assert_eq!(free.pricing().unwrap().price_per_token_nanos(), 0);
    }

    #[test]
    fn test_blank_api_key_is_absent() {
        let config = EmbeddingConfig {
            api_key: Some("   ".to_string()),
            ..EmbeddingConfig::default()
        };

        assert_eq!(config.resolved_api_key(), None);
    }
}
