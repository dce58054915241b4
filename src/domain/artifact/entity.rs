//! Schema artifact entity

use serde::{Deserialize, Serialize};

/// SQL column type of a generated column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ColumnType {
    Uuid,
    Text,
    Varchar { length: u32 },
    Integer,
    Bigint,
    Numeric { precision: u32, scale: u32 },
    Boolean,
    Timestamp,
    Date,
    Jsonb,
    /// Any type the renderer emits verbatim (enums, arrays, extensions)
    Custom { name: String },
}

/// A column in a generated table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: ColumnType,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl Column {
    /// Create a non-nullable column
    pub fn new(name: impl Into<String>, data_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: false,
            primary_key: false,
            unique: false,
            default: None,
        }
    }

    /// Mark the column as primary key
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Mark the column as nullable
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Mark the column as unique
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Set a default expression
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// A generated table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub columns: Vec<Column>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            columns: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Check whether the table declares a column
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }
}

/// Cardinality of a foreign-key relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    OneToOne,
    OneToMany,
    ManyToMany,
}

/// A foreign-key relationship between two tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
    pub kind: RelationshipKind,
}

impl Relationship {
    pub fn new(
        from: (&str, &str),
        to: (&str, &str),
        kind: RelationshipKind,
    ) -> Self {
        Self {
            from_table: from.0.to_string(),
            from_column: from.1.to_string(),
            to_table: to.0.to_string(),
            to_column: to.1.to_string(),
            kind,
        }
    }
}

/// Index access method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexMethod {
    #[default]
    Btree,
    Hash,
    Gin,
    Gist,
}

/// A secondary index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub table: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub method: IndexMethod,
}

/// Command a row-level security policy applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyCommand {
    Select,
    Insert,
    Update,
    Delete,
    All,
}

/// A row-level security policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub name: String,
    pub table: String,
    pub command: PolicyCommand,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub using: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check: Option<String>,
}

/// Structured schema definition
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub tables: Vec<Table>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    #[serde(default)]
    pub indexes: Vec<Index>,
    #[serde(default)]
    pub policies: Vec<Policy>,
}

impl SchemaDefinition {
    /// Find a table by name
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }
}

/// DDL rendered from the schema definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedSql {
    pub dialect: String,
    pub ddl: String,
}

impl RenderedSql {
    pub fn postgres(ddl: impl Into<String>) -> Self {
        Self {
            dialect: "postgresql".to_string(),
            ddl: ddl.into(),
        }
    }
}

/// Descriptive metadata attached by the generator
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// LLM that generated the schema
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator_model: Option<String>,
}

/// One generated schema: definition, rendered DDL and metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaArtifact {
    pub schema: SchemaDefinition,
    pub sql: RenderedSql,
    #[serde(default)]
    pub metadata: ArtifactMetadata,
}

impl SchemaArtifact {
    pub fn new(schema: SchemaDefinition, sql: RenderedSql) -> Self {
        Self {
            schema,
            sql,
            metadata: ArtifactMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: ArtifactMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Number of tables in the schema
    pub fn table_count(&self) -> usize {
        self.schema.tables.len()
    }
}

#[cfg(test)]
pub mod fixtures {
    use super::*;

    /// A small blog schema used across tests
    pub fn blog_artifact() -> SchemaArtifact {
        let users = Table::new("users")
            .with_column(Column::new("id", ColumnType::Uuid).primary_key())
            .with_column(Column::new("email", ColumnType::Varchar { length: 255 }).unique());

        let posts = Table::new("posts")
            .with_description("Blog posts")
            .with_column(Column::new("id", ColumnType::Uuid).primary_key())
            .with_column(Column::new("author_id", ColumnType::Uuid))
            .with_column(Column::new("body", ColumnType::Text).nullable())
            .with_column(
                Column::new("published_at", ColumnType::Timestamp).with_default("now()"),
            );

        let schema = SchemaDefinition {
            tables: vec![users, posts],
            relationships: vec![Relationship::new(
                ("posts", "author_id"),
                ("users", "id"),
                RelationshipKind::OneToMany,
            )],
            indexes: vec![Index {
                name: "idx_posts_author".to_string(),
                table: "posts".to_string(),
                columns: vec!["author_id".to_string()],
                unique: false,
                method: IndexMethod::Btree,
            }],
            policies: vec![Policy {
                name: "authors_own_posts".to_string(),
                table: "posts".to_string(),
                command: PolicyCommand::All,
                using: Some("author_id = auth.uid()".to_string()),
                check: None,
            }],
        };

        SchemaArtifact::new(
            schema,
            RenderedSql::postgres("CREATE TABLE users (...); CREATE TABLE posts (...);"),
        )
        .with_metadata(ArtifactMetadata {
            title: Some("Blog".to_string()),
            description: Some("Users and their posts".to_string()),
            generator_model: Some("gpt-4o".to_string()),
        })
    }

    /// A single-table schema distinct from the blog one
    pub fn inventory_artifact() -> SchemaArtifact {
        let items = Table::new("items")
            .with_column(Column::new("sku", ColumnType::Text).primary_key())
            .with_column(Column::new(
                "price",
                ColumnType::Numeric {
                    precision: 10,
                    scale: 2,
                },
            ));

        SchemaArtifact::new(
            SchemaDefinition {
                tables: vec![items],
                ..Default::default()
            },
            RenderedSql::postgres("CREATE TABLE items (...);"),
        )
    }
}
