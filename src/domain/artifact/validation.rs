//! Structural validation of schema artifacts
//!
//! Only well-formedness is checked (names present, references resolve).
//! Whether the schema is a good answer to the prompt is not the cache's concern.

use std::collections::HashSet;
use std::fmt;

use super::SchemaArtifact;
use crate::domain::DomainError;

/// Artifact validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactValidationError {
    /// Schema declares no tables
    NoTables,
    /// A table has an empty name
    EmptyTableName,
    /// Two tables share a name
    DuplicateTable { table: String },
    /// A table declares no columns
    NoColumns { table: String },
    /// A column has an empty name
    EmptyColumnName { table: String },
    /// Two columns of the same table share a name
    DuplicateColumn { table: String, column: String },
    /// A reference points at a table that does not exist
    UnknownTable { context: String, table: String },
    /// A reference points at a column that does not exist
    UnknownColumn {
        context: String,
        table: String,
        column: String,
    },
    /// An index lists no columns
    EmptyIndex { index: String },
    /// Rendered DDL is empty
    EmptyDdl,
}

impl fmt::Display for ArtifactValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoTables => write!(f, "Schema must declare at least one table"),
            Self::EmptyTableName => write!(f, "Table name cannot be empty"),
            Self::DuplicateTable { table } => write!(f, "Duplicate table '{}'", table),
            Self::NoColumns { table } => {
                write!(f, "Table '{}' must declare at least one column", table)
            }
            Self::EmptyColumnName { table } => {
                write!(f, "Column name cannot be empty in table '{}'", table)
            }
            Self::DuplicateColumn { table, column } => {
                write!(f, "Duplicate column '{}' in table '{}'", column, table)
            }
            Self::UnknownTable { context, table } => {
                write!(f, "{} references unknown table '{}'", context, table)
            }
            Self::UnknownColumn {
                context,
                table,
                column,
            } => write!(
                f,
                "{} references unknown column '{}.{}'",
                context, table, column
            ),
            Self::EmptyIndex { index } => {
                write!(f, "Index '{}' must list at least one column", index)
            }
            Self::EmptyDdl => write!(f, "Rendered DDL cannot be empty"),
        }
    }
}

impl std::error::Error for ArtifactValidationError {}

impl From<ArtifactValidationError> for DomainError {
    fn from(err: ArtifactValidationError) -> Self {
        DomainError::validation(err.to_string())
    }
}

/// Validate the structure of an artifact before it is cached
pub fn validate_artifact(artifact: &SchemaArtifact) -> Result<(), ArtifactValidationError> {
    let schema = &artifact.schema;

    if schema.tables.is_empty() {
        return Err(ArtifactValidationError::NoTables);
    }

    let mut table_names = HashSet::new();

    for table in &schema.tables {
        if table.name.trim().is_empty() {
            return Err(ArtifactValidationError::EmptyTableName);
        }

        if !table_names.insert(table.name.as_str()) {
            return Err(ArtifactValidationError::DuplicateTable {
                table: table.name.clone(),
            });
        }

        if table.columns.is_empty() {
            return Err(ArtifactValidationError::NoColumns {
                table: table.name.clone(),
            });
        }

        let mut column_names = HashSet::new();

        for column in &table.columns {
            if column.name.trim().is_empty() {
                return Err(ArtifactValidationError::EmptyColumnName {
                    table: table.name.clone(),
                });
            }

            if !column_names.insert(column.name.as_str()) {
                return Err(ArtifactValidationError::DuplicateColumn {
                    table: table.name.clone(),
                    column: column.name.clone(),
                });
            }
        }
    }

    for rel in &schema.relationships {
        let context = format!("Relationship {}.{}", rel.from_table, rel.from_column);
        check_column(artifact, &context, &rel.from_table, &rel.from_column)?;
        check_column(artifact, &context, &rel.to_table, &rel.to_column)?;
    }

    for index in &schema.indexes {
        if index.columns.is_empty() {
            return Err(ArtifactValidationError::EmptyIndex {
                index: index.name.clone(),
            });
        }

        let context = format!("Index '{}'", index.name);

        for column in &index.columns {
            check_column(artifact, &context, &index.table, column)?;
        }
    }

    for policy in &schema.policies {
        if schema.table(&policy.table).is_none() {
            return Err(ArtifactValidationError::UnknownTable {
                context: format!("Policy '{}'", policy.name),
                table: policy.table.clone(),
            });
        }
    }

    if artifact.sql.ddl.trim().is_empty() {
        return Err(ArtifactValidationError::EmptyDdl);
    }

    Ok(())
}

fn check_column(
    artifact: &SchemaArtifact,
    context: &str,
    table: &str,
    column: &str,
) -> Result<(), ArtifactValidationError> {
    let Some(found) = artifact.schema.table(table) else {
        return Err(ArtifactValidationError::UnknownTable {
            context: context.to_string(),
            table: table.to_string(),
        });
    };

    if !found.has_column(column) {
        return Err(ArtifactValidationError::UnknownColumn {
            context: context.to_string(),
            table: table.to_string(),
            column: column.to_string(),
        });
    }

    Ok(())
}
