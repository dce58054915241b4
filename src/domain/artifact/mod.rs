//! Generated schema artifacts
//!
//! The result of one schema generation: the structured schema definition,
//! the rendered DDL and descriptive metadata. Artifacts are immutable once
//! cached.

mod entity;
mod validation;

pub use entity::{
    ArtifactMetadata, Column, ColumnType, Index, IndexMethod, Policy, PolicyCommand,
    Relationship, RelationshipKind, RenderedSql, SchemaArtifact, SchemaDefinition, Table,
};
pub use validation::{validate_artifact, ArtifactValidationError};

#[cfg(test)]
pub use entity::fixtures;
