//! Infrastructure layer - Embedding providers, artifact stores and services

pub mod embedding;
pub mod logging;
pub mod observability;
pub mod semantic_cache;
pub mod services;
