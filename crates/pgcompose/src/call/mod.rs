//! Calls to routines with named parameters.
//!
//! A [`Proc`] holds a call template such as
//! `users.save(:id, _email:=:email, _name := :name)` and a sparse parameter set. Rendering binds
//! the parameters that are present, numbers them in template order and removes the assignment
//! fragments of everything else.

use std::collections::{BTreeMap, HashMap};

use crate::fields::FieldMap;
use crate::scan::{self, Token};
use crate::value::Value;

/// Call template plus its bound parameters.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Proc {
    template: String,
    params: FieldMap,
    format: Option<String>,
}

impl Proc {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            ..Self::default()
        }
    }

    /// Bind one parameter, replacing any previous value for `name`.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Union `params` into the bound parameters.
    pub fn set_params<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Like [`set_params`](Self::set_params), but only names listed in `allow` are taken from
    /// `params`. Parameters bound earlier are left untouched.
    pub fn set_params_only<K, V>(
        mut self,
        params: impl IntoIterator<Item = (K, V)>,
        allow: &[&str],
    ) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        for (k, v) in params {
            let name = k.into();
            if allow.contains(&name.as_str()) {
                self.params.insert(name, v.into());
            }
        }
        self
    }

    /// Wrap the rendered call: the first `{}` in `template` is replaced by the call text.
    pub fn format(mut self, template: impl Into<String>) -> Self {
        self.format = Some(template.into());
        self
    }

    pub fn params(&self) -> &FieldMap {
        &self.params
    }

    /// Render the call. Empty values count as unbound.
    pub fn to_sql(&self) -> (String, Vec<Value>) {
        let tokens = scan::tokenize(&self.template);

        let mut positions: HashMap<&str, usize> = HashMap::new();
        let mut args = Vec::new();
        for token in &tokens {
            let Token::Named(name) = *token else { continue };
            if positions.contains_key(name) {
                continue;
            }
            if let Some(value) = self.params.get(name).filter(|v| !v.is_empty()) {
                args.push(value.clone());
                positions.insert(name, args.len());
            }
        }

        let substituted = substitute(&tokens, &positions);
        let sql = cleanup(&substituted, !args.is_empty());
        let sql = match &self.format {
            Some(template) => template.replacen("{}", &sql, 1),
            None => sql,
        };
        (sql, args)
    }

    pub fn sql_string(&self) -> String {
        self.to_sql().0
    }

    pub fn args(&self) -> Vec<Value> {
        self.to_sql().1
    }
}

/// Replace bound names with `$n` and drop unbound ones together with their `label :=` prefix and
/// the separator that follows them.
fn substitute(tokens: &[Token<'_>], positions: &HashMap<&str, usize>) -> String {
    let mut out = String::new();
    // end of the last stretch of plain text in `out`; label stripping never crosses it
    let mut editable_from = 0;
    let mut strip_separator = false;

    for token in tokens {
        match *token {
            Token::Named(name) => match positions.get(name) {
                Some(pos) => {
                    out.push('$');
                    out.push_str(&pos.to_string());
                    editable_from = out.len();
                    strip_separator = false;
                }
                None => {
                    let keep = label_start(&out[editable_from..]);
                    out.truncate(editable_from + keep);
                    strip_separator = true;
                }
            },
            Token::Text(text) => {
                let text = if strip_separator {
                    let rest = text.trim_start();
                    rest.strip_prefix(',').unwrap_or(rest)
                } else {
                    text
                };
                out.push_str(text);
                strip_separator = false;
            }
            other => {
                other.write_to(&mut out);
                editable_from = out.len();
                strip_separator = false;
            }
        }
    }
    out
}

/// Length of `text` with a trailing `ident := ` label removed (or `text.len()` when there is none).
fn label_start(text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut end = text.trim_end().len();
    if !text[..end].ends_with(":=") {
        return text.len();
    }
    end -= 2;
    end = text[..end].trim_end().len();

    let mut start = end;
    while start > 0 && scan::is_ident_char(bytes[start - 1]) {
        start -= 1;
    }
    if start == end { text.len() } else { start }
}

fn cleanup(sql: &str, substituted: bool) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut after_positional = false;

    for token in scan::tokenize(sql) {
        match token {
            Token::Text(text) => {
                let mut text = strip_dangling_commas(text);
                if !substituted {
                    text = collapse_empty_parens(&text);
                } else if after_positional {
                    text = trim_before_close(&text);
                }
                out.push_str(&text);
            }
            other => other.write_to(&mut out),
        }
        after_positional = matches!(token, Token::Positional(_));
    }
    out
}

/// `, )` and `,  ,)` become `)`.
fn strip_dangling_commas(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch == ')' {
            let run_start = out
                .trim_end_matches(|c: char| c.is_whitespace() || c == ',')
                .len();
            if out[run_start..].contains(',') {
                out.truncate(run_start);
            }
        }
        out.push(ch);
    }
    out
}

/// `(   )` becomes `()`.
fn collapse_empty_parens(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch == ')' {
            let trimmed = out.trim_end().len();
            if out[..trimmed].ends_with('(') {
                out.truncate(trimmed);
            }
        }
        out.push(ch);
    }
    out
}

/// Text right after `$n`: a leading `[\s,]*)` becomes `)`.
fn trim_before_close(text: &str) -> String {
    let rest = text.trim_start_matches(|c: char| c.is_whitespace() || c == ',');
    if rest.starts_with(')') {
        rest.to_string()
    } else {
        text.to_string()
    }
}

/// How a rendered routine call is wrapped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CallStyle {
    /// `routine(...)`
    #[default]
    Bare,
    /// `SELECT routine(...)`, for routines returning a scalar or JSON.
    Select,
}

impl CallStyle {
    fn prefix(self) -> &'static str {
        match self {
            CallStyle::Bare => "",
            CallStyle::Select => "SELECT ",
        }
    }
}

/// Render `routine(a:=$1,b:=$2)` from a parameter map.
///
/// Empty values are dropped and the surviving names are sorted, so the text depends only on which
/// parameters are present and not on map iteration order.
pub fn proc_named_sql<K, V>(
    routine: &str,
    params: impl IntoIterator<Item = (K, V)>,
    style: CallStyle,
) -> (String, Vec<Value>)
where
    K: Into<String>,
    V: Into<Value>,
{
    let present: BTreeMap<String, Value> = params
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .filter(|(_, v)| !v.is_empty())
        .collect();

    let mut assignments = Vec::with_capacity(present.len());
    let mut args = Vec::with_capacity(present.len());
    for (name, value) in present {
        args.push(value);
        assignments.push(format!("{name}:=${}", args.len()));
    }

    let sql = format!("{}{routine}({})", style.prefix(), assignments.join(","));
    (sql, args)
}
