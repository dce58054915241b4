//! Artifact store selection at startup

use std::sync::Arc;

use tracing::info;

use super::in_memory::InMemoryArtifactStore;
use super::postgres::{PostgresArtifactStore, PostgresStoreConfig};
use crate::config::{StoreBackend, StoreConfig};
use crate::domain::semantic_cache::ArtifactStore;
use crate::domain::DomainError;

/// Factory for creating artifact stores
#[derive(Debug)]
pub struct ArtifactStoreFactory;

impl ArtifactStoreFactory {
    /// Create the store named by the configuration
    pub async fn create(config: &StoreConfig) -> Result<Arc<dyn ArtifactStore>, DomainError> {
        match config.backend {
            StoreBackend::Memory => {
                info!("Using in-memory artifact store");
                Ok(Arc::new(InMemoryArtifactStore::new()))
            }
            StoreBackend::Postgres => {
                let postgres = Self::postgres_config(config)?;
                let store = PostgresArtifactStore::connect(&postgres).await?;
                Ok(Arc::new(store))
            }
        }
    }

    /// Translate the application store section into pool settings
    pub fn postgres_config(config: &StoreConfig) -> Result<PostgresStoreConfig, DomainError> {
        let url = config.resolved_url().ok_or_else(|| {
            DomainError::configuration(
                "PostgreSQL store selected but no store.url or DATABASE_URL is set",
            )
        })?;

        let postgres = PostgresStoreConfig::new(url)
            .with_table_name(&config.table_name)
            .with_max_connections(config.max_connections)
            .with_min_connections(config.min_connections)
            .with_connect_timeout(config.connect_timeout_secs)
            .with_idle_timeout(config.idle_timeout_secs);

        postgres.validate()?;

        Ok(postgres)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_in_memory() {
        let store = ArtifactStoreFactory::create(&StoreConfig::default())
            .await
            .unwrap();

        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[test]
    fn test_postgres_config_from_store_section() {
        let config = StoreConfig {
            backend: StoreBackend::Postgres,
            url: Some("postgres://localhost/cache".to_string()),
            table_name: "cached_schemas".to_string(),
            max_connections: 4,
            ..StoreConfig::default()
        };

        let postgres = ArtifactStoreFactory::postgres_config(&config).unwrap();

        assert_eq!(postgres.url, "postgres://localhost/cache");
        assert_eq!(postgres.table_name, "cached_schemas");
        assert_eq!(postgres.max_connections, 4);
        assert_eq!(postgres.idle_timeout_secs, 600);
    }

    #[test]
    fn test_postgres_config_rejects_bad_table_name() {
        let config = StoreConfig {
            backend: StoreBackend::Postgres,
            url: Some("postgres://localhost/cache".to_string()),
            table_name: "drop table".to_string(),
            ..StoreConfig::default()
        };

        let err = ArtifactStoreFactory::postgres_config(&config).unwrap_err();

        assert!(matches!(err, DomainError::Configuration { .. }));
    }
}
