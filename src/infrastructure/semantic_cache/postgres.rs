//! PostgreSQL artifact store

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::info;

use crate::domain::artifact::SchemaArtifact;
use crate::domain::semantic_cache::{
    ArtifactStore, CacheEntry, ScanFilter, StoreAggregate, StoredEmbedding,
};
use crate::domain::DomainError;

const COLUMNS: &str = "id, prompt_text, embedding_model, embedding, artifact, tokens_used, \
                       hit_count, similarity_total, created_at, last_hit_at";

/// Convert a counter to `BIGINT`, rejecting values Postgres cannot hold
fn to_bigint(value: u64, column: &str) -> Result<i64, DomainError> {
    i64::try_from(value).map_err(|_| {
        DomainError::validation(format!("{} {} exceeds the BIGINT range", column, value))
    })
}

/// PostgreSQL store configuration
#[derive(Debug, Clone)]
pub struct PostgresStoreConfig {
    /// Database connection URL
    pub url: String,
    /// Table holding the cache entries
    pub table_name: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections to maintain
    pub min_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
    /// Idle timeout in seconds
    pub idle_timeout_secs: u64,
}

impl PostgresStoreConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            table_name: "schema_cache_entries".to_string(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 30,
            idle_timeout_secs: 600,
        }
    }

    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn with_connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    pub fn with_idle_timeout(mut self, secs: u64) -> Self {
        self.idle_timeout_secs = secs;
        self
    }

    /// Table names are interpolated into SQL, so only plain identifiers pass
    pub fn validate(&self) -> Result<(), DomainError> {
        let valid = !self.table_name.is_empty()
            && self
                .table_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
            && !self.table_name.starts_with(|c: char| c.is_ascii_digit());

        if !valid {
            return Err(DomainError::configuration(format!(
                "Invalid table name '{}'",
                self.table_name
            )));
        }

        Ok(())
    }
}

/// Artifact store backed by a single PostgreSQL table
///
/// Embeddings live in a `REAL[]` column and artifacts as `JSONB`. Hit
/// accounting is a single `UPDATE`, so concurrent hits never lose counts.
#[derive(Debug, Clone)]
pub struct PostgresArtifactStore {
    pool: PgPool,
    table_name: String,
}

impl PostgresArtifactStore {
    pub fn new(pool: PgPool, table_name: impl Into<String>) -> Self {
        Self {
            pool,
            table_name: table_name.into(),
        }
    }

    /// Connect with a pool and make sure the table exists
    pub async fn connect(config: &PostgresStoreConfig) -> Result<Self, DomainError> {
        config.validate()?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to connect to PostgreSQL: {}", e)))?;

        let store = Self::new(pool, &config.table_name);
        store.ensure_table().await?;

        info!(table = %config.table_name, "PostgreSQL artifact store ready");

        Ok(store)
    }

    /// Create the entries table and its indexes when missing
    pub async fn ensure_table(&self) -> Result<(), DomainError> {
        let table = &self.table_name;

        let statements = [
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS {table} (
                    id TEXT PRIMARY KEY,
                    prompt_text TEXT NOT NULL,
                    embedding_model TEXT,
                    dimensions INTEGER,
                    embedding REAL[],
                    artifact JSONB NOT NULL,
                    tokens_used BIGINT NOT NULL,
                    hit_count BIGINT NOT NULL DEFAULT 0,
                    similarity_total DOUBLE PRECISION NOT NULL DEFAULT 0,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    last_hit_at TIMESTAMPTZ
                )
                "#
            ),
            format!(
                "CREATE INDEX IF NOT EXISTS {table}_model_idx ON {table} (embedding_model, dimensions)"
            ),
            format!("CREATE INDEX IF NOT EXISTS {table}_prompt_idx ON {table} (prompt_text)"),
            format!("CREATE INDEX IF NOT EXISTS {table}_created_idx ON {table} (created_at)"),
        ];

        for statement in &statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| DomainError::storage(format!("Failed to create table: {}", e)))?;
        }

        Ok(())
    }

    fn row_to_entry(row: &PgRow) -> Result<CacheEntry, DomainError> {
        let decode = |e: sqlx::Error| DomainError::storage(format!("Failed to read row: {}", e));

        let model: Option<String> = row.try_get("embedding_model").map_err(decode)?;
        let vector: Option<Vec<f32>> = row.try_get("embedding").map_err(decode)?;
        let embedding = match (model, vector) {
            (Some(model), Some(vector)) => Some(StoredEmbedding::new(model, vector)),
            _ => None,
        };

        let artifact: serde_json::Value = row.try_get("artifact").map_err(decode)?;
        let artifact: SchemaArtifact = serde_json::from_value(artifact)
            .map_err(|e| DomainError::storage(format!("Failed to deserialize artifact: {}", e)))?;

        let tokens_used: i64 = row.try_get("tokens_used").map_err(decode)?;
        let hit_count: i64 = row.try_get("hit_count").map_err(decode)?;

        Ok(CacheEntry::restore(
            row.try_get("id").map_err(decode)?,
            row.try_get("prompt_text").map_err(decode)?,
            embedding,
            artifact,
            tokens_used.max(0) as u64,
            hit_count.max(0) as u64,
            row.try_get("similarity_total").map_err(decode)?,
            row.try_get("created_at").map_err(decode)?,
            row.try_get("last_hit_at").map_err(decode)?,
        ))
    }

    fn rows_to_entries(rows: &[PgRow]) -> Result<Vec<CacheEntry>, DomainError> {
        rows.iter().map(Self::row_to_entry).collect()
    }
}

#[async_trait]
impl ArtifactStore for PostgresArtifactStore {
    async fn insert(&self, entry: CacheEntry) -> Result<(), DomainError> {
        let artifact = serde_json::to_value(entry.artifact())
            .map_err(|e| DomainError::storage(format!("Failed to serialize artifact: {}", e)))?;

        let query = format!(
            r#"
            INSERT INTO {} (id, prompt_text, embedding_model, dimensions, embedding, artifact,
                            tokens_used, hit_count, similarity_total, created_at, last_hit_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
            self.table_name
        );

        let embedding = entry.embedding();
        let tokens_used = to_bigint(entry.tokens_used(), "tokens_used")?;
        let hit_count = to_bigint(entry.hit_count(), "hit_count")?;

        sqlx::query(&query)
            .bind(entry.id())
            .bind(entry.prompt_text())
            .bind(embedding.map(|e| e.model().to_string()))
            .bind(embedding.map(|e| e.dimensions() as i32))
            .bind(embedding.map(|e| e.vector().to_vec()))
            .bind(&artifact)
            .bind(tokens_used)
            .bind(hit_count)
            .bind(entry.similarity_total())
            .bind(entry.created_at())
            .bind(entry.last_hit_at())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to insert entry: {}", e)))?;

        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<CacheEntry>, DomainError> {
        let query = format!("SELECT {} FROM {} WHERE id = $1", COLUMNS, self.table_name);

        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get entry: {}", e)))?;

        row.as_ref().map(Self::row_to_entry).transpose()
    }

    async fn scan(&self, filter: &ScanFilter) -> Result<Vec<CacheEntry>, DomainError> {
        let query = format!(
            r#"
            SELECT {} FROM {}
            WHERE embedding IS NOT NULL AND embedding_model = $1 AND dimensions = $2
            "#,
            COLUMNS, self.table_name
        );

        let rows = sqlx::query(&query)
            .bind(&filter.model)
            .bind(filter.dimensions as i32)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to scan entries: {}", e)))?;

        Self::rows_to_entries(&rows)
    }

    async fn find_by_prompt(&self, prompt: &str) -> Result<Vec<CacheEntry>, DomainError> {
        let query = format!(
            "SELECT {} FROM {} WHERE prompt_text = $1",
            COLUMNS, self.table_name
        );

        let rows = sqlx::query(&query)
            .bind(prompt)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to find entries: {}", e)))?;

        Self::rows_to_entries(&rows)
    }

    async fn update_hit(
        &self,
        id: &str,
        similarity: f32,
        at: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        // GREATEST skips NULL, so a first hit just takes `at`
        let query = format!(
            r#"
            UPDATE {}
            SET hit_count = hit_count + 1,
                similarity_total = similarity_total + $2,
                last_hit_at = GREATEST(last_hit_at, $3)
            WHERE id = $1
            "#,
            self.table_name
        );

        let result = sqlx::query(&query)
            .bind(id)
            .bind(similarity as f64)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to record hit: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: &str) -> Result<bool, DomainError> {
        let query = format!("DELETE FROM {} WHERE id = $1", self.table_name);

        let result = sqlx::query(&query)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to delete entry: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<u64, DomainError> {
        let query = format!("SELECT COUNT(*) AS count FROM {}", self.table_name);

        let row = sqlx::query(&query)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to count entries: {}", e)))?;

        let count: i64 = row.get("count");
        Ok(count.max(0) as u64)
    }

    async fn aggregate(&self) -> Result<StoreAggregate, DomainError> {
        let query = format!(
            r#"
            SELECT COUNT(*) AS entries,
                   COALESCE(SUM(hit_count), 0)::BIGINT AS hits,
                   COALESCE(SUM(tokens_used * hit_count), 0)::BIGINT AS tokens_saved,
                   COALESCE(SUM(similarity_total), 0)::DOUBLE PRECISION AS similarity_total
            FROM {}
            "#,
            self.table_name
        );

        let row = sqlx::query(&query)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to aggregate entries: {}", e)))?;

        let entries: i64 = row.get("entries");
        let hits: i64 = row.get("hits");
        let tokens_saved: i64 = row.get("tokens_saved");

        Ok(StoreAggregate {
            entries: entries.max(0) as u64,
            hits: hits.max(0) as u64,
            tokens_saved: tokens_saved.max(0) as u64,
            similarity_total: row.get("similarity_total"),
        })
    }

    async fn delete_created_before(&self, cutoff: DateTime<Utc>) -> Result<usize, DomainError> {
        let query = format!("DELETE FROM {} WHERE created_at < $1", self.table_name);

        let result = sqlx::query(&query)
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to expire entries: {}", e)))?;

        Ok(result.rows_affected() as usize)
    }

    async fn retain_most_recent(&self, max_entries: usize) -> Result<usize, DomainError> {
        let query = format!(
            r#"
            DELETE FROM {table}
            WHERE id IN (
                SELECT id FROM {table}
                ORDER BY COALESCE(last_hit_at, created_at) DESC, id DESC
                OFFSET $1
            )
            "#,
            table = self.table_name
        );

        let result = sqlx::query(&query)
            .bind(max_entries as i64)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to trim entries: {}", e)))?;

        Ok(result.rows_affected() as usize)
    }

    async fn delete_foreign(&self, filter: &ScanFilter) -> Result<usize, DomainError> {
        let query = format!(
            r#"
            DELETE FROM {}
            WHERE embedding IS NOT NULL
              AND (embedding_model IS DISTINCT FROM $1 OR dimensions IS DISTINCT FROM $2)
            "#,
            self.table_name
        );

        let result = sqlx::query(&query)
            .bind(&filter.model)
            .bind(filter.dimensions as i32)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to purge entries: {}", e)))?;

        Ok(result.rows_affected() as usize)
    }
}
