//! Infrastructure services

mod eviction_service;
mod schema_cache_service;

pub use eviction_service::{EvictionJob, EvictionPolicy, EvictionReport};
pub use schema_cache_service::{CacheHit, MatchKind, SchemaCacheService};
