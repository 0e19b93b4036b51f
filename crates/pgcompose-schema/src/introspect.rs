//! Catalog introspection: the query and the source trait that runs it.

use crate::column::{ColumnSchema, TableSchema, normalize_type_name};
use crate::error::{SchemaError, SchemaResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_postgres::Row;

/// Table name to table schema, for one database.
pub type DbSchema = HashMap<String, Arc<TableSchema>>;

/// Which namespaces the catalog query covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    /// PostgreSQL schemas to introspect (default: `["public"]`).
    pub namespaces: Vec<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            namespaces: vec!["public".to_string()],
        }
    }
}

impl CatalogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the introspected namespaces.
    pub fn namespaces<I, S>(mut self, namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.namespaces = namespaces.into_iter().map(Into::into).collect();
        self
    }
}

/// One row of the catalog query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogColumn {
    pub table: String,
    pub column: String,
    /// Type as reported by `format_type`, before normalization.
    pub data_type: String,
    pub not_null: bool,
    pub primary_key: bool,
    pub default_expr: String,
}

/// Columns of ordinary and partitioned tables in catalog order.
///
/// A column is primary when any index covering it is flagged primary.
pub const CATALOG_SQL: &str = r#"
SELECT
  c.relname AS table_name,
  a.attname AS column_name,
  pg_catalog.format_type(a.atttypid, a.atttypmod) AS data_type,
  a.attnotnull AS not_null,
  EXISTS (
    SELECT 1
    FROM pg_catalog.pg_index i
    WHERE i.indrelid = a.attrelid
      AND i.indisprimary
      AND a.attnum = ANY(i.indkey)
  ) AS primary_key,
  COALESCE(pg_get_expr(d.adbin, d.adrelid), '') AS default_expr
FROM pg_catalog.pg_attribute a
JOIN pg_catalog.pg_class c ON c.oid = a.attrelid
JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
LEFT JOIN pg_catalog.pg_attrdef d ON d.adrelid = a.attrelid AND d.adnum = a.attnum
WHERE c.relkind IN ('r', 'p')
  AND a.attnum > 0
  AND NOT a.attisdropped
  AND n.nspname = ANY($1::text[])
ORDER BY c.oid, a.attnum
"#;

/// Anything that can answer the catalog query.
///
/// Implemented for `tokio_postgres::Client`, `tokio_postgres::Transaction` and, with the
/// `pool` feature, `deadpool_postgres::Client`.
#[async_trait::async_trait]
pub trait CatalogSource: Sync {
    /// Load every column in the configured namespaces, in catalog order.
    async fn load_columns(&self, config: &CatalogConfig) -> SchemaResult<Vec<CatalogColumn>>;
}

#[async_trait::async_trait]
impl CatalogSource for tokio_postgres::Client {
    async fn load_columns(&self, config: &CatalogConfig) -> SchemaResult<Vec<CatalogColumn>> {
        let rows = self.query(CATALOG_SQL, &[&config.namespaces]).await?;
        decode_rows(&rows)
    }
}

#[async_trait::async_trait]
impl<'a> CatalogSource for tokio_postgres::Transaction<'a> {
    async fn load_columns(&self, config: &CatalogConfig) -> SchemaResult<Vec<CatalogColumn>> {
        let rows = self.query(CATALOG_SQL, &[&config.namespaces]).await?;
        decode_rows(&rows)
    }
}

#[cfg(feature = "pool")]
#[async_trait::async_trait]
impl CatalogSource for deadpool_postgres::Client {
    async fn load_columns(&self, config: &CatalogConfig) -> SchemaResult<Vec<CatalogColumn>> {
        let rows = self.query(CATALOG_SQL, &[&config.namespaces]).await?;
        decode_rows(&rows)
    }
}

fn get_column<'a, T>(row: &'a Row, column: &str) -> SchemaResult<T>
where
    T: tokio_postgres::types::FromSql<'a>,
{
    row.try_get(column)
        .map_err(|e| SchemaError::decode(column, e.to_string()))
}

fn decode_rows(rows: &[Row]) -> SchemaResult<Vec<CatalogColumn>> {
    rows.iter()
        .map(|row| {
            Ok(CatalogColumn {
                table: get_column(row, "table_name")?,
                column: get_column(row, "column_name")?,
                data_type: get_column(row, "data_type")?,
                not_null: get_column(row, "not_null")?,
                primary_key: get_column(row, "primary_key")?,
                default_expr: get_column(row, "default_expr")?,
            })
        })
        .collect()
}

/// Group catalog rows into table schemas, keeping catalog order within each table.
pub fn build_db_schema(rows: Vec<CatalogColumn>) -> DbSchema {
    let mut tables: HashMap<String, TableSchema> = HashMap::new();

    for row in rows {
        let column = ColumnSchema {
            name: row.column,
            data_type: normalize_type_name(&row.data_type),
            not_null: row.not_null,
            primary_key: row.primary_key,
            default_expr: row.default_expr,
        };
        tables
            .entry(row.table.clone())
            .or_insert_with(|| TableSchema::new(row.table))
            .push_column(column);
    }

    tables
        .into_iter()
        .map(|(name, table)| (name, Arc::new(table)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(table: &str, column: &str, data_type: &str, pk: bool) -> CatalogColumn {
        CatalogColumn {
            table: table.to_string(),
            column: column.to_string(),
            data_type: data_type.to_string(),
            not_null: pk,
            primary_key: pk,
            default_expr: String::new(),
        }
    }

    #[test]
    fn test_groups_rows_by_table_in_order() {
        let schema = build_db_schema(vec![
            row("users", "id", "uuid", true),
            row("users", "email", "text", false),
            row("posts", "id", "bigint", true),
            row("users", "created_at", "timestamp with time zone", false),
        ]);

        assert_eq!(schema.len(), 2);
        let users = &schema["users"];
        let names: Vec<_> = users.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "email", "created_at"]);
        assert_eq!(users.columns[2].data_type, "timestamptz");
        assert_eq!(users.primary_keys.len(), 1);
    }

    #[test]
    fn test_keeps_every_primary_key_column() {
        let schema = build_db_schema(vec![
            row("memberships", "user_id", "uuid", true),
            row("memberships", "group_id", "uuid", true),
            row("memberships", "role", "text", false),
        ]);

        let pks: Vec<_> = schema["memberships"]
            .primary_keys
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(pks, vec!["user_id", "group_id"]);
    }

    #[test]
    fn test_config_defaults_to_public() {
        assert_eq!(CatalogConfig::default().namespaces, vec!["public"]);
        let config = CatalogConfig::new().namespaces(["app", "audit"]);
        assert_eq!(config.namespaces, vec!["app", "audit"]);
    }
}
