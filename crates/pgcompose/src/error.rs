//! Error types for pgcompose

use pgcompose_schema::SchemaError;
use thiserror::Error;

/// Result type alias for pgcompose operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for composition and execution
#[derive(Debug, Error)]
pub enum Error {
    /// Query execution error
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Schema catalog lookup or population failure
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The table's shape is not supported by the requested statement
    #[error("unsupported schema for table `{table}`: {reason}")]
    UnsupportedSchema { table: String, reason: String },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),
}

impl Error {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an unsupported-schema error
    pub fn unsupported_schema(table: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsupportedSchema {
            table: table.into(),
            reason: reason.into(),
        }
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is an unsupported-schema error
    pub fn is_unsupported_schema(&self) -> bool {
        matches!(self, Self::UnsupportedSchema { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this is an unknown-table lookup miss
    pub fn is_no_schema_for_table(&self) -> bool {
        matches!(self, Self::Schema(e) if e.is_no_schema_for_table())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for Error {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}
