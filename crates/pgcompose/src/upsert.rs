//! Schema-aware INSERT and UPDATE generation.
//!
//! An [`Upsert`] projects a row onto a table's catalog columns. Every projected column gets a
//! value holder derived from its type, nullability and default, so empty values fall back to
//! `NULL` or the column default instead of being written literally.
//!
//! ```ignore
//! let ads = Upsert::load(&catalog, "main", &client, "ads").await?;
//! let (sql, args) = ads.update_sql(&row, 42, &["ownlocal_id"])?;
//! // UPDATE ads SET ownlocal_id = nullif($1,0)::integer WHERE id=$2
//! ```

use std::sync::Arc;

use pgcompose_schema::{CatalogSource, ColumnSchema, SchemaCatalog, TableSchema};

use crate::client::GenericClient;
use crate::error::{Error, Result};
use crate::exec;
use crate::fields::RowFields;
use crate::value::Value;

/// Convert a row value for binding against `column`.
///
/// The zero timestamp and the nil uuid bind as `NULL`. Arrays bound to a non-array column are
/// sent as array-literal text; everything else passes through unchanged.
pub fn to_value(column: &ColumnSchema, value: Value) -> Value {
    if matches!(value, Value::Timestamp(_) | Value::Uuid(_)) && value.is_empty() {
        return Value::Null;
    }
    if value.is_array() && !column.is_array() {
        if let Some(literal) = value.to_array_literal() {
            return Value::Text(literal);
        }
    }
    value
}

/// Row projection onto one table.
#[derive(Clone, Debug)]
pub struct Upsert {
    table: Arc<TableSchema>,
    columns: Vec<String>,
    holders: Vec<String>,
    values: Vec<Value>,
    projected: bool,
}

impl Upsert {
    pub fn new(table: Arc<TableSchema>) -> Self {
        Self {
            table,
            columns: Vec::new(),
            holders: Vec::new(),
            values: Vec::new(),
            projected: false,
        }
    }

    /// Look up `table` through `catalog`, populating the catalog for `identity` if needed.
    pub async fn load<S>(
        catalog: &SchemaCatalog,
        identity: &str,
        source: &S,
        table: &str,
    ) -> Result<Self>
    where
        S: CatalogSource + ?Sized,
    {
        let schema = catalog.get_table_schema(identity, source, table).await?;
        Ok(Self::new(schema))
    }

    pub fn table(&self) -> &TableSchema {
        &self.table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn holders(&self) -> &[String] {
        &self.holders
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Project `row` onto the table's columns (restricted to `only` when non-empty).
    ///
    /// Columns are visited in catalog order; columns missing from the row are skipped.
    pub fn set<R: RowFields + ?Sized>(mut self, row: &R, only: &[&str]) -> Self {
        let mut fields = row.field_map();
        self.columns.clear();
        self.holders.clear();
        self.values.clear();

        for column in self.table.columns_by_name(only) {
            if let Some(value) = fields.remove(&column.name) {
                self.values.push(to_value(column, value));
                self.holders.push(column.to_value_holder(self.values.len()));
                self.columns.push(column.name.clone());
            }
        }
        self.projected = true;
        self
    }

    /// Re-project only the values of `row` for the columns chosen by the last [`set`](Self::set).
    ///
    /// Without a previous `set` this behaves like `set(row, &[])`.
    pub fn next<R: RowFields + ?Sized>(mut self, row: &R) -> Self {
        if !self.projected {
            return self.set(row, &[]);
        }
        let fields = row.field_map();
        let mut values = Vec::with_capacity(self.columns.len());
        for name in &self.columns {
            let value = fields.get(name).cloned().unwrap_or(Value::Null);
            values.push(match self.table.column(name) {
                Some(column) => to_value(column, value),
                None => value,
            });
        }
        self.values = values;
        self
    }

    fn ensure_projected_columns(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(Error::validation(format!(
                "no columns of table `{}` in row",
                self.table.name
            )));
        }
        Ok(())
    }

    /// Render an INSERT for the current projection.
    ///
    /// An empty projection is rejected with [`Error::Validation`].
    pub fn render_insert(&self) -> Result<(String, Vec<Value>)> {
        self.ensure_projected_columns()?;
        let sql = format!(
            "INSERT INTO {}({}) VALUES({})",
            self.table.name,
            self.columns.join(","),
            self.holders.join(",")
        );
        Ok((sql, self.values.clone()))
    }

    /// Render an UPDATE for the current projection, keyed by the table's primary key.
    ///
    /// Tables with no primary key or a compound one are rejected with
    /// [`Error::UnsupportedSchema`]; an empty projection with [`Error::Validation`].
    pub fn render_update(&self, pkey: impl Into<Value>) -> Result<(String, Vec<Value>)> {
        let pk = match self.table.primary_keys.as_slice() {
            [pk] => pk,
            [] => {
                return Err(Error::unsupported_schema(
                    &self.table.name,
                    "UPDATE requires a primary key",
                ));
            }
            keys => {
                return Err(Error::unsupported_schema(
                    &self.table.name,
                    format!("compound primary keys are not supported ({} columns)", keys.len()),
                ));
            }
        };
        self.ensure_projected_columns()?;

        let assignments: Vec<String> = self
            .columns
            .iter()
            .zip(&self.holders)
            .map(|(column, holder)| format!("{column} = {holder}"))
            .collect();

        let mut args = self.values.clone();
        args.push(pkey.into());
        let sql = format!(
            "UPDATE {} SET {} WHERE {}=${}",
            self.table.name,
            assignments.join(","),
            pk.name,
            args.len()
        );
        Ok((sql, args))
    }

    /// Project every column of `row` and render an INSERT.
    pub fn insert_sql<R: RowFields + ?Sized>(&self, row: &R) -> Result<(String, Vec<Value>)> {
        self.clone().set(row, &[]).render_insert()
    }

    /// Project `row` (restricted to `only` when non-empty) and render an UPDATE keyed by `pkey`.
    pub fn update_sql<R: RowFields + ?Sized>(
        &self,
        row: &R,
        pkey: impl Into<Value>,
        only: &[&str],
    ) -> Result<(String, Vec<Value>)> {
        self.clone().set(row, only).render_update(pkey)
    }

    /// Render and execute an INSERT, returning the affected row count.
    pub async fn insert_with<C, R>(&self, client: &C, row: &R) -> Result<u64>
    where
        C: GenericClient,
        R: RowFields + ?Sized,
    {
        let (sql, args) = self.insert_sql(row)?;
        exec::execute(client, &sql, &args).await
    }

    /// Render and execute an UPDATE, returning the affected row count.
    pub async fn update_with<C, R>(
        &self,
        client: &C,
        row: &R,
        pkey: impl Into<Value>,
        only: &[&str],
    ) -> Result<u64>
    where
        C: GenericClient,
        R: RowFields + ?Sized,
    {
        let (sql, args) = self.update_sql(row, pkey, only)?;
        exec::execute(client, &sql, &args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldMap;

    fn ads() -> Arc<TableSchema> {
        Arc::new(TableSchema::with_columns(
            "ads",
            vec![
                ColumnSchema::new("id", "uuid")
                    .not_null()
                    .primary_key()
                    .default_expr("uuid_generate_v4()"),
                ColumnSchema::new("ownlocal_id", "integer"),
                ColumnSchema::new("title", "text").not_null(),
                ColumnSchema::new("tags", "text[]"),
                ColumnSchema::new("pdf_url", "text"),
            ],
        ))
    }

    fn row(pairs: &[(&str, Value)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_insert_follows_catalog_order() {
        let data = row(&[
            ("title", Value::from("Bike")),
            ("ownlocal_id", Value::from(7)),
            ("unknown", Value::from(1)),
        ]);
        let (sql, args) = Upsert::new(ads()).insert_sql(&data).unwrap();

        assert_eq!(
            sql,
            "INSERT INTO ads(ownlocal_id,title) VALUES(nullif($1,0)::integer,$2)"
        );
        assert_eq!(args, vec![Value::from(7), Value::from("Bike")]);
    }

    #[test]
    fn test_single_nullable_integer_column() {
        let table = Arc::new(TableSchema::with_columns(
            "t",
            vec![ColumnSchema::new("n", "integer")],
        ));
        let (sql, args) = Upsert::new(table)
            .insert_sql(&row(&[("n", Value::from(1))]))
            .unwrap();
        assert_eq!(sql, "INSERT INTO t(n) VALUES(nullif($1,0)::integer)");
        assert_eq!(args, vec![Value::from(1)]);
    }

    #[test]
    fn test_update_with_allow_list() {
        let data = row(&[
            ("title", Value::from("Bike")),
            ("ownlocal_id", Value::from(7)),
        ]);
        let (sql, args) = Upsert::new(ads())
            .update_sql(&data, "2ec72d3f", &["ownlocal_id"])
            .unwrap();

        assert_eq!(
            sql,
            "UPDATE ads SET ownlocal_id = nullif($1,0)::integer WHERE id=$2"
        );
        assert_eq!(args, vec![Value::from(7), Value::from("2ec72d3f")]);
    }

    #[test]
    fn test_update_joins_assignments_without_spaces() {
        let data = row(&[
            ("title", Value::from("Bike")),
            ("pdf_url", Value::from("a.pdf")),
        ]);
        let (sql, _) = Upsert::new(ads()).update_sql(&data, 1, &[]).unwrap();
        assert_eq!(
            sql,
            "UPDATE ads SET title = $1,pdf_url = nullif($2,'')::text WHERE id=$3"
        );
    }

    #[test]
    fn test_compound_primary_key_is_an_error() {
        let table = Arc::new(TableSchema::with_columns(
            "pairs",
            vec![
                ColumnSchema::new("a", "integer").not_null().primary_key(),
                ColumnSchema::new("b", "integer").not_null().primary_key(),
                ColumnSchema::new("v", "text"),
            ],
        ));
        let err = Upsert::new(table)
            .update_sql(&row(&[("v", Value::from("x"))]), 1, &[])
            .unwrap_err();

        assert!(err.is_unsupported_schema());
        assert!(err.to_string().contains("pairs"));
    }

    #[test]
    fn test_missing_primary_key_is_an_error() {
        let table = Arc::new(TableSchema::with_columns(
            "logs",
            vec![ColumnSchema::new("line", "text")],
        ));
        let err = Upsert::new(table)
            .update_sql(&row(&[("line", Value::from("x"))]), 1, &[])
            .unwrap_err();
        assert!(err.is_unsupported_schema());
    }

    #[test]
    fn test_arrays_stay_native_for_array_columns() {
        let data = row(&[
            ("tags", Value::from(vec!["a", "b"])),
            ("pdf_url", Value::from(vec!["x"])),
        ]);
        let upsert = Upsert::new(ads()).set(&data, &[]);

        assert_eq!(
            upsert.values(),
            &[
                Value::TextArray(vec!["a".into(), "b".into()]),
                Value::Text("{\"x\"}".into()),
            ]
        );
        assert_eq!(
            upsert.holders()[0],
            "nullif($1::text[],ARRAY[]::text[])::text[]"
        );
    }

    #[test]
    fn test_next_reuses_column_set() {
        let first = row(&[
            ("title", Value::from("Bike")),
            ("ownlocal_id", Value::from(7)),
        ]);
        let second = row(&[
            ("title", Value::from("Car")),
            ("pdf_url", Value::from("ignored")),
        ]);

        let upsert = Upsert::new(ads()).set(&first, &[]);
        let (sql_before, _) = upsert.render_insert().unwrap();
        let upsert = upsert.next(&second);
        let (sql_after, args) = upsert.render_insert().unwrap();

        assert_eq!(sql_before, sql_after);
        assert_eq!(args, vec![Value::Null, Value::from("Car")]);
    }

    #[test]
    fn test_next_without_set_projects_everything() {
        let data = row(&[("title", Value::from("Bike"))]);
        let upsert = Upsert::new(ads()).next(&data);
        assert_eq!(upsert.columns(), &["title".to_string()]);
    }

    #[test]
    fn test_rendering_does_not_mutate_the_template() {
        let upsert = Upsert::new(ads());
        let _ = upsert.insert_sql(&row(&[("title", Value::from("Bike"))]));
        assert!(upsert.columns().is_empty());
        assert!(upsert.values().is_empty());
    }

    #[test]
    fn test_empty_projection_is_a_validation_error() {
        let data = row(&[("unknown", Value::from(1))]);

        let err = Upsert::new(ads()).insert_sql(&data).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("ads"));

        let err = Upsert::new(ads()).update_sql(&data, 1, &[]).unwrap_err();
        assert!(err.is_validation());

        let err = Upsert::new(ads())
            .update_sql(&row(&[("title", Value::from("Bike"))]), 1, &["pdf_url"])
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_zero_timestamp_and_nil_uuid_bind_null() {
        let at = ColumnSchema::new("at", "timestamptz");
        let id = ColumnSchema::new("id", "uuid");
        assert_eq!(
            to_value(&at, Value::from(crate::value::zero_timestamp())),
            Value::Null
        );
        assert_eq!(to_value(&id, Value::from(uuid::Uuid::nil())), Value::Null);

        let now = chrono::Utc::now();
        assert_eq!(to_value(&at, Value::from(now)), Value::from(now));

        let table = Arc::new(TableSchema::with_columns(
            "events",
            vec![
                ColumnSchema::new("ref", "uuid"),
                ColumnSchema::new("at", "timestamptz")
                    .not_null()
                    .default_expr("now()"),
            ],
        ));
        let data = row(&[
            ("ref", Value::from(uuid::Uuid::nil())),
            ("at", Value::from(crate::value::zero_timestamp())),
        ]);
        let (sql, args) = Upsert::new(table).insert_sql(&data).unwrap();
        assert_eq!(
            sql,
            "INSERT INTO events(ref,at) VALUES(nullif($1,'')::uuid,\
             coalesce(nullif($2,'0001-01-01 00:00:00 zulu')::timestamptz,now()))"
        );
        assert_eq!(args, vec![Value::Null, Value::Null]);
    }

    #[test]
    fn test_bigint_above_i32_binds_through_text_sentinel() {
        use bytes::BytesMut;
        use tokio_postgres::types::{ToSql, Type};

        let table = Arc::new(TableSchema::with_columns(
            "counters",
            vec![ColumnSchema::new("big", "bigint")],
        ));
        let big = 5_000_000_000i64;
        let (sql, args) = Upsert::new(table)
            .insert_sql(&row(&[("big", Value::from(big))]))
            .unwrap();

        assert_eq!(sql, "INSERT INTO counters(big) VALUES(nullif($1,'')::bigint)");
        assert_eq!(args, vec![Value::from(big)]);

        let mut buf = BytesMut::new();
        args[0].to_sql(&Type::TEXT, &mut buf).unwrap();
        assert_eq!(&buf[..], b"5000000000");
    }
}
