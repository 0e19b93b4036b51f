//! Dynamic argument values.
//!
//! Every builder renders to `(sql, Vec<Value>)`. [`Value`] is a closed set of the value kinds the
//! builders need to classify ("is this empty?") and that tokio-postgres can bind.

use bytes::BytesMut;
use chrono::{DateTime, Utc};
use std::error::Error as StdError;
use tokio_postgres::types::{IsNull, Kind, ToSql, Type};
use uuid::Uuid;

/// Unix seconds of `0001-01-01T00:00:00Z`, the zero timestamp.
const ZERO_TIMESTAMP_SECS: i64 = -62_135_596_800;

/// A bindable argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    Json(serde_json::Value),
    TextArray(Vec<String>),
    IntArray(Vec<i64>),
}

/// The zero timestamp (`0001-01-01T00:00:00Z`).
pub fn zero_timestamp() -> DateTime<Utc> {
    DateTime::from_timestamp(ZERO_TIMESTAMP_SECS, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

impl Value {
    /// Whether this value counts as "not provided" for its kind.
    ///
    /// Null, zero-length text/bytes/arrays, zero numbers, `false`, the nil uuid, the zero
    /// timestamp and JSON `null` / empty JSON containers are empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(b) => !b,
            Value::Int(i) => *i == 0,
            Value::Float(f) => *f == 0.0,
            Value::Text(s) => s.is_empty(),
            Value::Bytes(b) => b.is_empty(),
            Value::Uuid(u) => u.is_nil(),
            Value::Timestamp(t) => *t == zero_timestamp(),
            Value::Json(v) => match v {
                serde_json::Value::Null => true,
                serde_json::Value::String(s) => s.is_empty(),
                serde_json::Value::Array(a) => a.is_empty(),
                serde_json::Value::Object(o) => o.is_empty(),
                _ => false,
            },
            Value::TextArray(v) => v.is_empty(),
            Value::IntArray(v) => v.is_empty(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::TextArray(_) | Value::IntArray(_))
    }

    /// Short name of the value kind, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Uuid(_) => "uuid",
            Value::Timestamp(_) => "timestamp",
            Value::Json(_) => "json",
            Value::TextArray(_) => "text[]",
            Value::IntArray(_) => "int[]",
        }
    }

    /// Postgres array-literal text for array values (`{"a","b"}`, `{1,2}`).
    pub fn to_array_literal(&self) -> Option<String> {
        match self {
            Value::TextArray(items) => {
                let quoted: Vec<String> = items
                    .iter()
                    .map(|s| format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")))
                    .collect();
                Some(format!("{{{}}}", quoted.join(",")))
            }
            Value::IntArray(items) => {
                let parts: Vec<String> = items.iter().map(i64::to_string).collect();
                Some(format!("{{{}}}", parts.join(",")))
            }
            _ => None,
        }
    }

    /// The value's text form, used when Postgres infers a textual parameter type.
    fn to_text(&self) -> Option<String> {
        match self {
            Value::Null | Value::Bytes(_) => None,
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Text(s) => Some(s.clone()),
            Value::Uuid(u) => Some(u.to_string()),
            Value::Timestamp(t) => Some(t.to_rfc3339()),
            Value::Json(v) => Some(v.to_string()),
            Value::TextArray(_) | Value::IntArray(_) => self.to_array_literal(),
        }
    }

    fn mismatch(&self, ty: &Type) -> Box<dyn StdError + Sync + Send> {
        format!("cannot bind {} value as {}", self.kind_name(), ty).into()
    }
}

fn is_textual(ty: &Type) -> bool {
    matches!(
        *ty,
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN
    ) || matches!(ty.kind(), Kind::Enum(_))
        || matches!(ty.name(), "citext" | "ltree" | "lquery" | "ltxtquery")
}

/// Boolean spellings Postgres accepts on input.
fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "t" | "true" | "y" | "yes" | "on" | "1" => Some(true),
        "f" | "false" | "n" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

impl ToSql for Value {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        if let Value::Null = self {
            return Ok(IsNull::Yes);
        }
        if is_textual(ty) {
            let text = self.to_text().ok_or_else(|| self.mismatch(ty))?;
            return text.as_str().to_sql(ty, out);
        }

        match (self, ty) {
            (Value::Bool(b), &Type::BOOL) => b.to_sql(ty, out),
            (Value::Int(i), &Type::INT2) => i16::try_from(*i)?.to_sql(ty, out),
            (Value::Int(i), &Type::INT4) => i32::try_from(*i)?.to_sql(ty, out),
            (Value::Int(i), &Type::INT8) => i.to_sql(ty, out),
            (Value::Int(i), &Type::FLOAT8) => (*i as f64).to_sql(ty, out),
            (Value::Float(f), &Type::FLOAT8) => f.to_sql(ty, out),
            (Value::Float(f), &Type::FLOAT4) => (*f as f32).to_sql(ty, out),
            (Value::Text(s), &Type::BOOL) => parse_bool(s)
                .ok_or_else(|| self.mismatch(ty))?
                .to_sql(ty, out),
            (Value::Text(s), &Type::INT2) => s.trim().parse::<i16>()?.to_sql(ty, out),
            (Value::Text(s), &Type::INT4) => s.trim().parse::<i32>()?.to_sql(ty, out),
            (Value::Text(s), &Type::INT8) => s.trim().parse::<i64>()?.to_sql(ty, out),
            (Value::Text(s), &Type::FLOAT4) => s.trim().parse::<f32>()?.to_sql(ty, out),
            (Value::Text(s), &Type::FLOAT8) => s.trim().parse::<f64>()?.to_sql(ty, out),
            (Value::Text(s), &Type::UUID) => Uuid::parse_str(s)?.to_sql(ty, out),
            (Value::Text(s), &Type::JSON | &Type::JSONB) => {
                serde_json::from_str::<serde_json::Value>(s)?.to_sql(ty, out)
            }
            (Value::Bytes(b), &Type::BYTEA) => b.to_sql(ty, out),
            (Value::Uuid(u), &Type::UUID) => u.to_sql(ty, out),
            (Value::Timestamp(t), &Type::TIMESTAMPTZ) => t.to_sql(ty, out),
            (Value::Timestamp(t), &Type::TIMESTAMP) => t.naive_utc().to_sql(ty, out),
            (Value::Timestamp(t), &Type::DATE) => t.date_naive().to_sql(ty, out),
            (Value::Json(v), &Type::JSON | &Type::JSONB) => v.to_sql(ty, out),
            (Value::TextArray(v), _) if matches!(ty.kind(), Kind::Array(_)) => v.to_sql(ty, out),
            (Value::IntArray(v), &Type::INT8_ARRAY) => v.to_sql(ty, out),
            (Value::IntArray(v), &Type::INT4_ARRAY) => v
                .iter()
                .map(|i| i32::try_from(*i))
                .collect::<Result<Vec<_>, _>>()?
                .to_sql(ty, out),
            (Value::IntArray(v), &Type::INT2_ARRAY) => v
                .iter()
                .map(|i| i16::try_from(*i))
                .collect::<Result<Vec<_>, _>>()?
                .to_sql(ty, out),
            _ => Err(self.mismatch(ty)),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    tokio_postgres::types::to_sql_checked!();
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::Int(v.into())
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v.into())
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Value::TextArray(v)
    }
}

impl<'a> From<Vec<&'a str>> for Value {
    fn from(v: Vec<&'a str>) -> Self {
        Value::TextArray(v.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<i32>> for Value {
    fn from(v: Vec<i32>) -> Self {
        Value::IntArray(v.into_iter().map(i64::from).collect())
    }
}

impl From<Vec<i64>> for Value {
    fn from(v: Vec<i64>) -> Self {
        Value::IntArray(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Argument lists accepted by the builder methods.
///
/// `()` means "no arguments"; arrays and vectors convert element-wise.
pub trait IntoArgs {
    fn into_args(self) -> Vec<Value>;
}

impl IntoArgs for () {
    fn into_args(self) -> Vec<Value> {
        Vec::new()
    }
}

impl<T: Into<Value>, const N: usize> IntoArgs for [T; N] {
    fn into_args(self) -> Vec<Value> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<T: Into<Value>> IntoArgs for Vec<T> {
    fn into_args(self) -> Vec<Value> {
        self.into_iter().map(Into::into).collect()
    }
}
