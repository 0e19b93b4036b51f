//! # pgcompose
//!
//! Composable PostgreSQL statements on top of `tokio-postgres`.
//!
//! ## Features
//!
//! - **Statement composition**: SELECT fragments with locally numbered `$n` placeholders, renumbered
//!   on render so independently written fragments combine into one statement
//! - **Named-parameter calls**: `routine(:a, _b := :b)` templates rendered from sparse parameter
//!   sets, unbound assignments removed
//! - **Schema-aware upserts**: INSERT/UPDATE generated from the live catalog, mapping empty values
//!   to `NULL` or the column default
//! - **Transaction-friendly**: pass a transaction anywhere a `GenericClient` is expected
//!
//! Every builder renders to plain `(String, Vec<Value>)`; executing it is up to the caller or the
//! thin helpers in [`exec`].
//!
//! ```ignore
//! use pgcompose::{select, Proc};
//!
//! let (sql, args) = select("u.*", ())
//!     .from("users u", ())
//!     .where_("name = $1", ["troy"])
//!     .to_sql(&[]);
//!
//! let (sql, args) = Proc::new("users.save(:id, _email := :email)")
//!     .set("id", 1)
//!     .to_sql();
//! // users.save($1)
//! ```

pub mod call;
pub mod client;
pub mod error;
pub mod exec;
pub mod fields;
mod scan;
pub mod select;
pub mod upsert;
pub mod value;

#[cfg(feature = "pool")]
pub mod pool;

pub use call::{CallStyle, Proc, proc_named_sql};
pub use client::{Built, GenericClient};
pub use error::{Error, Result};
pub use fields::{FieldMap, RowFields, fields_from_serialize};
pub use select::{SelectFrom, SelectStmt, select, select_from, select_where};
pub use upsert::{Upsert, to_value};
pub use value::{IntoArgs, Value};

#[cfg(feature = "pool")]
pub use pool::{create_pool, create_pool_with_config};

#[cfg(feature = "derive")]
pub use pgcompose_derive::RowFields;

pub use pgcompose_schema as schema;
pub use pgcompose_schema::{
    CatalogConfig, CatalogSource, ColumnSchema, SchemaCatalog, SchemaError, TableSchema,
};
