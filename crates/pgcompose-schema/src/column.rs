//! Column and table metadata plus the per-column value holder synthesis.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Empty literal used for timestamp columns (the zero instant of the wire format).
pub const EMPTY_TIMESTAMP_LITERAL: &str = "'0001-01-01 00:00:00 zulu'";

/// One column as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    /// Normalized SQL type name (`timestamptz`, `integer`, `text[]`, ...).
    pub data_type: String,
    pub not_null: bool,
    pub primary_key: bool,
    /// Default expression text; empty when the column has no default.
    pub default_expr: String,
}

impl ColumnSchema {
    /// Create a nullable column without a default.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: normalize_type_name(&data_type.into()),
            not_null: false,
            primary_key: false,
            default_expr: String::new(),
        }
    }

    /// Mark the column `NOT NULL`.
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Mark the column as (part of) the primary key.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Set the default expression.
    pub fn default_expr(mut self, expr: impl Into<String>) -> Self {
        self.default_expr = expr.into();
        self
    }

    pub fn has_default(&self) -> bool {
        !self.default_expr.is_empty()
    }

    pub fn is_array(&self) -> bool {
        self.data_type.ends_with("[]")
    }

    /// The SQL literal treated as "not provided" for this column's type.
    ///
    /// Unknown types fall back to `''`.
    pub fn empty_value(&self) -> String {
        match self.data_type.as_str() {
            "timestamptz" | "timestamp" => EMPTY_TIMESTAMP_LITERAL.to_string(),
            "integer" => "0".to_string(),
            "boolean" => "false".to_string(),
            t if t.ends_with("[]") => format!("ARRAY[]::{t}"),
            _ => "''".to_string(),
        }
    }

    /// Placeholder text for this column in generated INSERT/UPDATE SQL.
    ///
    /// `position` is the 1-based argument position; `0` yields a named `:column` holder.
    ///
    /// - NOT NULL with a default: `coalesce(nullif(<holder>,<empty>)::<type>,<default>)`
    /// - nullable: `nullif(<holder>,<empty>)::<type>`
    /// - NOT NULL without a default: the bare holder
    pub fn to_value_holder(&self, position: usize) -> String {
        let empty = self.empty_value();
        let mut holder = if position > 0 {
            format!("${position}")
        } else {
            format!(":{}", self.name)
        };
        // A cast empty literal needs a cast holder so nullif compares like with like.
        if empty.contains("::") {
            holder = format!("{holder}::{}", self.data_type);
        }

        if self.not_null && self.has_default() {
            format!(
                "coalesce(nullif({holder},{empty})::{},{})",
                self.data_type, self.default_expr
            )
        } else if !self.not_null {
            format!("nullif({holder},{empty})::{}", self.data_type)
        } else {
            holder
        }
    }
}

/// Canonicalize a `format_type` name.
pub fn normalize_type_name(data_type: &str) -> String {
    match data_type {
        "timestamp with time zone" => "timestamptz".to_string(),
        "timestamp without time zone" => "timestamp".to_string(),
        other => other.to_string(),
    }
}

/// A table with its columns in catalog order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnSchema>,
    /// Primary-key columns, in catalog order.
    pub primary_keys: Vec<ColumnSchema>,
}

impl TableSchema {
    /// Create an empty table schema.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_keys: Vec::new(),
        }
    }

    /// Build a table schema from columns in catalog order.
    pub fn with_columns(name: impl Into<String>, columns: Vec<ColumnSchema>) -> Self {
        let mut table = Self::new(name);
        for column in columns {
            table.push_column(column);
        }
        table
    }

    /// Append a column, tracking it as a primary key when flagged.
    pub fn push_column(&mut self, column: ColumnSchema) {
        if column.primary_key {
            self.primary_keys.push(column.clone());
        }
        self.columns.push(column);
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Columns matching `names`, in catalog order.
    ///
    /// Each name may itself be a comma-separated list (`"id, email"`). Unknown names are
    /// ignored. An empty `names` selects every column.
    pub fn columns_by_name<S: AsRef<str>>(&self, names: &[S]) -> Vec<&ColumnSchema> {
        if names.is_empty() {
            return self.columns.iter().collect();
        }

        let wanted: HashSet<&str> = names
            .iter()
            .flat_map(|n| n.as_ref().split(','))
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .collect();

        self.columns
            .iter()
            .filter(|c| wanted.contains(c.name.as_str()))
            .collect()
    }
}
