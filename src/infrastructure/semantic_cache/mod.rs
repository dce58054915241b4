//! Artifact store implementations

mod factory;
mod in_memory;
mod postgres;

pub use factory::ArtifactStoreFactory;
pub use in_memory::InMemoryArtifactStore;
pub use postgres::{PostgresArtifactStore, PostgresStoreConfig};
