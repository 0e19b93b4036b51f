//! Composable SELECT statements.
//!
//! Every fragment carries its own locally numbered placeholders (`$1`, `$2`, ...) and arguments.
//! Rendering renumbers each fragment after the arguments accumulated before it, so fragments can
//! be written independently and still produce one consistent statement.

use std::fmt;

use crate::scan;
use crate::value::{IntoArgs, Value};

#[derive(Clone, Debug, PartialEq)]
struct Fragment {
    sql: String,
    args: Vec<Value>,
}

impl Fragment {
    fn new(sql: impl Into<String>, args: impl IntoArgs) -> Self {
        Self {
            sql: sql.into(),
            args: args.into_args(),
        }
    }
}

/// Output accumulator: renumbers fragments against the arguments collected so far.
struct Renderer {
    sql: String,
    args: Vec<Value>,
}

impl Renderer {
    fn new(previous: &[Value]) -> Self {
        Self {
            sql: String::new(),
            args: previous.to_vec(),
        }
    }

    fn push_fragment(&mut self, fragment: &Fragment, wrap: bool) {
        let sql = scan::renumber(&fragment.sql, self.args.len());
        if wrap {
            self.sql.push('(');
            self.sql.push_str(&sql);
            self.sql.push(')');
        } else {
            self.sql.push_str(&sql);
        }
        self.args.extend(fragment.args.iter().cloned());
    }

    fn clause(&mut self, keyword: &str, joiner: &str, fragments: &[Fragment], wrap: bool) {
        if fragments.is_empty() {
            return;
        }
        self.sql.push_str(keyword);
        for (i, fragment) in fragments.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(joiner);
            }
            self.push_fragment(fragment, wrap);
        }
    }

    fn joins(&mut self, fragments: &[Fragment]) {
        for fragment in fragments {
            self.sql.push_str(if starts_with_join(&fragment.sql) {
                "\n"
            } else {
                "\nJOIN "
            });
            self.push_fragment(fragment, false);
        }
    }

    fn limit(&mut self, limit: i64) {
        if limit > 0 {
            self.sql.push_str("\nLIMIT ");
            self.sql.push_str(&limit.to_string());
        }
    }
}

/// `LEFT JOIN x ON ...` and `JOIN x ON ...` already carry their keyword.
fn starts_with_join(sql: &str) -> bool {
    let words: Vec<String> = sql
        .split_whitespace()
        .take(3)
        .map(str::to_uppercase)
        .collect();
    words.len() > 2 && (words[0] == "JOIN" || words[1] == "JOIN")
}

/// Clauses shared by [`SelectStmt`] and [`SelectFrom`].
#[derive(Clone, Debug, Default, PartialEq)]
struct Tail {
    where_: Vec<Fragment>,
    group: Vec<Fragment>,
    having: Vec<Fragment>,
    order: Vec<Fragment>,
    limit: i64,
}

impl Tail {
    fn render(&self, r: &mut Renderer) {
        r.clause("\nWHERE ", " AND ", &self.where_, true);
        r.clause("\nGROUP BY ", ", ", &self.group, false);
        r.clause("\nHAVING ", " AND ", &self.having, true);
        r.clause("\nORDER BY ", ", ", &self.order, false);
        r.limit(self.limit);
    }
}

/// SELECT builder composed clause by clause.
///
/// ```ignore
/// let stmt = SelectStmt::new()
///     .select("u.*", ())
///     .from("users u", ())
///     .where_("name = $1", ["troy"]);
/// let (sql, args) = stmt.to_sql(&[]);
/// assert_eq!(sql, "SELECT u.*\nFROM users u\nWHERE (name = $1)");
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SelectStmt {
    select: Vec<Fragment>,
    from: Vec<Fragment>,
    join: Vec<Fragment>,
    tail: Tail,
}

impl SelectStmt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(mut self, sql: impl Into<String>, args: impl IntoArgs) -> Self {
        self.select.push(Fragment::new(sql, args));
        self
    }

    pub fn from(mut self, sql: impl Into<String>, args: impl IntoArgs) -> Self {
        self.from.push(Fragment::new(sql, args));
        self
    }

    /// Add a join. `JOIN ` is prepended unless the fragment already starts with a join keyword.
    pub fn join(mut self, sql: impl Into<String>, args: impl IntoArgs) -> Self {
        self.join.push(Fragment::new(sql, args));
        self
    }

    /// Add a WHERE condition; conditions are parenthesized and joined with AND.
    pub fn where_(mut self, sql: impl Into<String>, args: impl IntoArgs) -> Self {
        self.tail.where_.push(Fragment::new(sql, args));
        self
    }

    pub fn group(mut self, sql: impl Into<String>, args: impl IntoArgs) -> Self {
        self.tail.group.push(Fragment::new(sql, args));
        self
    }

    /// Add a HAVING condition; parenthesized and joined with AND like WHERE.
    pub fn having(mut self, sql: impl Into<String>, args: impl IntoArgs) -> Self {
        self.tail.having.push(Fragment::new(sql, args));
        self
    }

    pub fn order(mut self, sql: impl Into<String>, args: impl IntoArgs) -> Self {
        self.tail.order.push(Fragment::new(sql, args));
        self
    }

    /// Set the limit. Values `<= 0` render no LIMIT clause.
    pub fn limit(mut self, limit: i64) -> Self {
        self.tail.limit = limit;
        self
    }

    /// Set the limit only when none has been set yet.
    pub fn limit_or(mut self, limit: i64) -> Self {
        if self.tail.limit <= 0 {
            self.tail.limit = limit;
        }
        self
    }

    /// Render the statement, numbering placeholders after `previous`.
    ///
    /// The returned arguments start with `previous`, followed by every fragment's arguments in
    /// clause order.
    pub fn to_sql(&self, previous: &[Value]) -> (String, Vec<Value>) {
        let mut r = Renderer::new(previous);
        r.clause("SELECT ", ", ", &self.select, false);
        r.clause("\nFROM ", ", ", &self.from, false);
        r.joins(&self.join);
        self.tail.render(&mut r);
        (r.sql, r.args)
    }

    pub fn sql_string(&self, previous: &[Value]) -> String {
        self.to_sql(previous).0
    }

    pub fn args(&self, previous: &[Value]) -> Vec<Value> {
        self.to_sql(previous).1
    }
}

impl fmt::Display for SelectStmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql_string(&[]))
    }
}

/// SELECT builder over a hand-written `SELECT ... FROM ...` prefix.
///
/// Only WHERE, GROUP BY, HAVING, ORDER BY and LIMIT are composed; the prefix is emitted verbatim.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SelectFrom {
    prefix: String,
    tail: Tail,
    format: Option<String>,
}

impl SelectFrom {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    /// Replace the prefix.
    pub fn select(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn where_(mut self, sql: impl Into<String>, args: impl IntoArgs) -> Self {
        self.tail.where_.push(Fragment::new(sql, args));
        self
    }

    pub fn group(mut self, sql: impl Into<String>, args: impl IntoArgs) -> Self {
        self.tail.group.push(Fragment::new(sql, args));
        self
    }

    pub fn having(mut self, sql: impl Into<String>, args: impl IntoArgs) -> Self {
        self.tail.having.push(Fragment::new(sql, args));
        self
    }

    pub fn order(mut self, sql: impl Into<String>, args: impl IntoArgs) -> Self {
        self.tail.order.push(Fragment::new(sql, args));
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.tail.limit = limit;
        self
    }

    pub fn limit_or(mut self, limit: i64) -> Self {
        if self.tail.limit <= 0 {
            self.tail.limit = limit;
        }
        self
    }

    /// Wrap the rendered text: the first `{}` in `template` is replaced by the statement.
    pub fn format(mut self, template: impl Into<String>) -> Self {
        self.format = Some(template.into());
        self
    }

    pub fn to_sql(&self, previous: &[Value]) -> (String, Vec<Value>) {
        let mut r = Renderer::new(previous);
        r.sql.push_str(&self.prefix);
        self.tail.render(&mut r);
        let sql = match &self.format {
            Some(template) => template.replacen("{}", &r.sql, 1),
            None => r.sql,
        };
        (sql, r.args)
    }

    pub fn sql_string(&self, previous: &[Value]) -> String {
        self.to_sql(previous).0
    }

    pub fn args(&self, previous: &[Value]) -> Vec<Value> {
        self.to_sql(previous).1
    }
}

impl fmt::Display for SelectFrom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql_string(&[]))
    }
}

/// Start a composed statement with a SELECT fragment.
pub fn select(sql: impl Into<String>, args: impl IntoArgs) -> SelectStmt {
    SelectStmt::new().select(sql, args)
}

/// Start a statement from a literal `SELECT ... FROM ...` prefix.
pub fn select_from(prefix: impl Into<String>) -> SelectFrom {
    SelectFrom::new(prefix)
}

/// Start a composed statement with a WHERE fragment.
pub fn select_where(sql: impl Into<String>, args: impl IntoArgs) -> SelectStmt {
    SelectStmt::new().where_(sql, args)
}
