//! Thin execution helpers over [`GenericClient`].
//!
//! Reads follow "first row, first column" semantics: no rows is not an error, it yields `None`
//! (JSON) or the type's default (`""`, `0`).

use serde::de::DeserializeOwned;
use tokio_postgres::Row;
use tokio_postgres::types::Type;

use crate::call::{CallStyle, proc_named_sql};
use crate::client::{GenericClient, params_ref};
use crate::error::{Error, Result};
use crate::value::Value;

const MAX_LOGGED_SQL: usize = 200;

fn truncate_sql(sql: &str) -> String {
    if sql.len() <= MAX_LOGGED_SQL {
        return sql.to_string();
    }
    let mut end = MAX_LOGGED_SQL;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &sql[..end])
}

fn log_sql(op: &'static str, sql: &str, args: &[Value]) {
    tracing::debug!(
        target: "pgcompose.sql",
        op,
        sql = %truncate_sql(sql),
        args = args.len(),
        "executing"
    );
}

/// Execute a statement and return the number of affected rows.
pub async fn execute<C: GenericClient>(client: &C, sql: &str, args: &[Value]) -> Result<u64> {
    log_sql("execute", sql, args);
    client.execute(sql, &params_ref(args)).await
}

/// Decode the first column of the first row as JSON into `T`.
///
/// No rows, SQL `NULL` and an empty text value all yield `Ok(None)`.
pub async fn get_json<T, C>(client: &C, sql: &str, args: &[Value]) -> Result<Option<T>>
where
    T: DeserializeOwned,
    C: GenericClient,
{
    log_sql("get_json", sql, args);
    let Some(row) = client.query_opt(sql, &params_ref(args)).await? else {
        return Ok(None);
    };
    match first_column_json(&row)? {
        Some(json) => Ok(Some(serde_json::from_value(json)?)),
        None => Ok(None),
    }
}

/// First column of the first row as text; no rows or `NULL` yield `""`.
pub async fn get_string<C: GenericClient>(client: &C, sql: &str, args: &[Value]) -> Result<String> {
    log_sql("get_string", sql, args);
    let Some(row) = client.query_opt(sql, &params_ref(args)).await? else {
        return Ok(String::new());
    };
    let value: Option<String> = row
        .try_get(0)
        .map_err(|e| Error::decode(column_name(&row), e.to_string()))?;
    Ok(value.unwrap_or_default())
}

/// First column of the first row as an integer; no rows or `NULL` yield `0`.
pub async fn get_int<C: GenericClient>(client: &C, sql: &str, args: &[Value]) -> Result<i64> {
    log_sql("get_int", sql, args);
    let Some(row) = client.query_opt(sql, &params_ref(args)).await? else {
        return Ok(0);
    };
    let decode = |e: tokio_postgres::Error| Error::decode(column_name(&row), e.to_string());
    let value = match first_column_type(&row) {
        Some(&Type::INT2) => row.try_get::<_, Option<i16>>(0).map_err(decode)?.map(i64::from),
        Some(&Type::INT4) => row.try_get::<_, Option<i32>>(0).map_err(decode)?.map(i64::from),
        _ => row.try_get::<_, Option<i64>>(0).map_err(decode)?,
    };
    Ok(value.unwrap_or_default())
}

/// Call `routine` with named parameters and decode its JSON result.
///
/// Renders `SELECT routine(a:=$1,...)` with empty parameters dropped.
pub async fn proc_named_json<T, C, K, V>(
    client: &C,
    routine: &str,
    params: impl IntoIterator<Item = (K, V)>,
) -> Result<Option<T>>
where
    T: DeserializeOwned,
    C: GenericClient,
    K: Into<String>,
    V: Into<Value>,
{
    let (sql, args) = proc_named_sql(routine, params, CallStyle::Select);
    get_json(client, &sql, &args).await
}

/// Call `routine` with named parameters and return its text result.
pub async fn proc_named_string<C, K, V>(
    client: &C,
    routine: &str,
    params: impl IntoIterator<Item = (K, V)>,
) -> Result<String>
where
    C: GenericClient,
    K: Into<String>,
    V: Into<Value>,
{
    let (sql, args) = proc_named_sql(routine, params, CallStyle::Select);
    get_string(client, &sql, &args).await
}

fn first_column_type(row: &Row) -> Option<&Type> {
    row.columns().first().map(|c| c.type_())
}

fn column_name(row: &Row) -> String {
    row.columns()
        .first()
        .map_or_else(|| "0".to_string(), |c| c.name().to_string())
}

fn first_column_json(row: &Row) -> Result<Option<serde_json::Value>> {
    let decode = |e: tokio_postgres::Error| Error::decode(column_name(row), e.to_string());
    match first_column_type(row) {
        Some(&Type::JSON) | Some(&Type::JSONB) => row
            .try_get::<_, Option<serde_json::Value>>(0)
            .map_err(decode),
        _ => {
            let text: Option<String> = row.try_get(0).map_err(decode)?;
            match text.as_deref() {
                None | Some("") => Ok(None),
                Some(s) => Ok(Some(serde_json::from_str(s)?)),
            }
        }
    }
}
