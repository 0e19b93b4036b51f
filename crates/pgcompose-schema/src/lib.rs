//! pgcompose-schema
//!
//! Column metadata read from a live PostgreSQL catalog, cached per connection identity.
//!
//! The cache is an owned [`SchemaCatalog`] value: hold one per process (or per pool) and pass it
//! to whatever needs schema lookups. Each identity is populated once with a single catalog query.
//!
//! # Example
//!
//! ```ignore
//! use pgcompose_schema::SchemaCatalog;
//!
//! let catalog = SchemaCatalog::new();
//! let ads = catalog.get_table_schema("main", &client, "ads").await?;
//! for column in &ads.columns {
//!     println!("{} -> {}", column.name, column.to_value_holder(0));
//! }
//! ```

pub mod catalog;
pub mod column;
pub mod error;
pub mod introspect;

pub use catalog::SchemaCatalog;
pub use column::{ColumnSchema, EMPTY_TIMESTAMP_LITERAL, TableSchema, normalize_type_name};
pub use error::{SchemaError, SchemaResult};
pub use introspect::{
    CATALOG_SQL, CatalogColumn, CatalogConfig, CatalogSource, DbSchema, build_db_schema,
};
