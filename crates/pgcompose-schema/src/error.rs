//! Error types for pgcompose-schema

use thiserror::Error;

/// Result type for catalog operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Error type for catalog operations.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Database error from tokio-postgres while running the catalog query.
    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),
    /// The table is not present in the populated catalog.
    #[error("no schema for table `{table}`")]
    NoSchemaForTable { table: String },
    /// Decode error when reading a catalog column.
    #[error("Decode error for column '{column}': {message}")]
    Decode { column: String, message: String },
    /// Pool or other source-specific error.
    #[error("{0}")]
    Other(String),
}

impl SchemaError {
    /// Create a decode error.
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        SchemaError::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a lookup-miss error for `table`.
    pub fn no_schema_for_table(table: impl Into<String>) -> Self {
        SchemaError::NoSchemaForTable {
            table: table.into(),
        }
    }

    /// Check if this is a lookup miss.
    pub fn is_no_schema_for_table(&self) -> bool {
        matches!(self, Self::NoSchemaForTable { .. })
    }
}
