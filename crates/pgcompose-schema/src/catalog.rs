//! Read-through schema cache keyed by connection identity.

use crate::column::TableSchema;
use crate::error::{SchemaError, SchemaResult};
use crate::introspect::{CatalogConfig, CatalogSource, DbSchema, build_db_schema};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// Lazily populated table metadata, one entry per connection identity.
///
/// Each identity is populated once, by a single catalog query run under the write lock.
/// Entries live as long as the catalog; there is no refresh path, so schema changes made
/// while the process runs are not observed. A failed population caches nothing.
///
/// # Example
///
/// ```ignore
/// let catalog = SchemaCatalog::new();
/// let users = catalog.get_table_schema("primary", &client, "users").await?;
/// ```
#[derive(Debug, Default)]
pub struct SchemaCatalog {
    config: CatalogConfig,
    entries: RwLock<HashMap<String, Arc<DbSchema>>>,
}

impl SchemaCatalog {
    /// Create a catalog covering the `public` namespace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog with a custom introspection scope.
    pub fn with_config(config: CatalogConfig) -> Self {
        Self {
            config,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Table metadata for `identity`, populating it from `source` on first use.
    pub async fn get_schema<S>(&self, identity: &str, source: &S) -> SchemaResult<Arc<DbSchema>>
    where
        S: CatalogSource + ?Sized,
    {
        if let Some(schema) = self.entries.read().await.get(identity) {
            tracing::trace!(target: "pgcompose.schema", identity, "schema cache hit");
            return Ok(Arc::clone(schema));
        }

        let mut entries = self.entries.write().await;
        // Another caller may have populated the entry while we waited for the lock.
        if let Some(schema) = entries.get(identity) {
            return Ok(Arc::clone(schema));
        }

        let started = Instant::now();
        let rows = match source.load_columns(&self.config).await {
            Ok(rows) => rows,
            Err(error) => {
                tracing::warn!(target: "pgcompose.schema", identity, %error, "catalog population failed");
                return Err(error);
            }
        };
        let schema = Arc::new(build_db_schema(rows));
        tracing::debug!(
            target: "pgcompose.schema",
            identity,
            tables = schema.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "schema catalog populated"
        );

        entries.insert(identity.to_string(), Arc::clone(&schema));
        Ok(schema)
    }

    /// Metadata for one table, or [`SchemaError::NoSchemaForTable`] when it is unknown.
    pub async fn get_table_schema<S>(
        &self,
        identity: &str,
        source: &S,
        table: &str,
    ) -> SchemaResult<Arc<TableSchema>>
    where
        S: CatalogSource + ?Sized,
    {
        let schema = self.get_schema(identity, source).await?;
        schema
            .get(table)
            .cloned()
            .ok_or_else(|| SchemaError::no_schema_for_table(table))
    }

    /// Whether `identity` has been populated.
    pub async fn is_populated(&self, identity: &str) -> bool {
        self.entries.read().await.contains_key(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspect::CatalogColumn;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingSource {
        calls: AtomicUsize,
        fail_first: bool,
    }

    impl CountingSource {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_first: false,
            }
        }

        fn failing_once() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_first: true,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl CatalogSource for CountingSource {
        async fn load_columns(&self, config: &CatalogConfig) -> SchemaResult<Vec<CatalogColumn>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(config.namespaces, vec!["public"]);
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self.fail_first && call == 0 {
                return Err(SchemaError::Other("connection reset".to_string()));
            }
            Ok(vec![
                CatalogColumn {
                    table: "users".to_string(),
                    column: "id".to_string(),
                    data_type: "uuid".to_string(),
                    not_null: true,
                    primary_key: true,
                    default_expr: "gen_random_uuid()".to_string(),
                },
                CatalogColumn {
                    table: "users".to_string(),
                    column: "email".to_string(),
                    data_type: "text".to_string(),
                    not_null: false,
                    primary_key: false,
                    default_expr: String::new(),
                },
            ])
        }
    }

    #[tokio::test]
    async fn test_populates_once_and_serves_from_cache() {
        let catalog = SchemaCatalog::new();
        let source = CountingSource::new();

        assert!(!catalog.is_populated("db").await);
        let first = catalog.get_schema("db", &source).await.unwrap();
        let second = catalog.get_schema("db", &source).await.unwrap();

        assert_eq!(source.calls(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert!(catalog.is_populated("db").await);
    }

    #[tokio::test]
    async fn test_identities_are_cached_separately() {
        let catalog = SchemaCatalog::new();
        let source = CountingSource::new();

        catalog.get_schema("primary", &source).await.unwrap();
        catalog.get_schema("replica", &source).await.unwrap();
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_access_queries_once() {
        let catalog = Arc::new(SchemaCatalog::new());
        let source = Arc::new(CountingSource::new());

        let mut handles = Vec::new();
        for _ in 0..16 {
            let catalog = Arc::clone(&catalog);
            let source = Arc::clone(&source);
            handles.push(tokio::spawn(async move {
                catalog.get_schema("db", source.as_ref()).await.unwrap()
            }));
        }

        let mut schemas = Vec::new();
        for handle in handles {
            schemas.push(handle.await.unwrap());
        }

        assert_eq!(source.calls(), 1);
        assert!(schemas.iter().all(|s| Arc::ptr_eq(s, &schemas[0])));
    }

    #[tokio::test]
    async fn test_failed_population_is_not_cached() {
        let catalog = SchemaCatalog::new();
        let source = CountingSource::failing_once();

        let err = catalog.get_schema("db", &source).await.unwrap_err();
        assert!(matches!(err, SchemaError::Other(_)));
        assert!(!catalog.is_populated("db").await);

        let schema = catalog.get_schema("db", &source).await.unwrap();
        assert!(schema.contains_key("users"));
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_table_lookup() {
        let catalog = SchemaCatalog::new();
        let source = CountingSource::new();

        let users = catalog
            .get_table_schema("db", &source, "users")
            .await
            .unwrap();
        assert_eq!(users.columns.len(), 2);
        assert_eq!(users.primary_keys[0].name, "id");

        let err = catalog
            .get_table_schema("db", &source, "missing")
            .await
            .unwrap_err();
        assert!(err.is_no_schema_for_table());
        assert_eq!(err.to_string(), "no schema for table `missing`");
        assert_eq!(source.calls(), 1);
    }
}
