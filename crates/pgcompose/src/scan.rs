//! Placeholder/literal tokenizer shared by the builders.
//!
//! The grammar is deliberately small:
//! - a literal span delimited by single quotes (a doubled quote stays inside the literal)
//! - a positional placeholder `$<digits>`
//! - a named placeholder `:<identifier>` (not part of a `::` cast or a `:=` assignment)
//! - everything else is text
//!
//! Literal spans are never rewritten, so `'$1 special'` survives renumbering verbatim.

use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Token<'a> {
    Text(&'a str),
    Literal(&'a str),
    Positional(usize),
    Named(&'a str),
}

impl Token<'_> {
    pub(crate) fn write_to(&self, out: &mut String) {
        match self {
            Token::Text(s) | Token::Literal(s) => out.push_str(s),
            Token::Positional(n) => {
                let _ = write!(out, "${n}");
            }
            Token::Named(name) => {
                out.push(':');
                out.push_str(name);
            }
        }
    }
}

pub(crate) fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

pub(crate) fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Split `sql` into text, literal and placeholder tokens.
pub(crate) fn tokenize(sql: &str) -> Vec<Token<'_>> {
    let bytes = sql.as_bytes();
    let mut tokens = Vec::new();
    let mut text_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let (token, end) = match bytes[i] {
            b'\'' => {
                let end = literal_end(bytes, i);
                (Token::Literal(&sql[i..end]), end)
            }
            b'$' if i == 0 || !is_ident_char(bytes[i - 1]) => {
                let end = scan_while(bytes, i + 1, |b| b.is_ascii_digit());
                let standalone = end > i + 1 && (end == bytes.len() || !is_ident_char(bytes[end]));
                match sql[i + 1..end].parse::<usize>() {
                    Ok(n) if standalone => (Token::Positional(n), end),
                    _ => {
                        i += 1;
                        continue;
                    }
                }
            }
            b':' if is_named_start(bytes, i) => {
                let end = scan_while(bytes, i + 1, is_ident_char);
                (Token::Named(&sql[i + 1..end]), end)
            }
            _ => {
                i += 1;
                continue;
            }
        };

        if text_start < i {
            tokens.push(Token::Text(&sql[text_start..i]));
        }
        tokens.push(token);
        i = end;
        text_start = end;
    }

    if text_start < bytes.len() {
        tokens.push(Token::Text(&sql[text_start..]));
    }
    tokens
}

/// Shift every `$n` (n > 0) outside literals by `offset`.
pub(crate) fn renumber(sql: &str, offset: usize) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    for token in tokenize(sql) {
        match token {
            Token::Positional(n) if n > 0 => match n.checked_add(offset) {
                Some(shifted) => {
                    let _ = write!(out, "${shifted}");
                }
                None => token.write_to(&mut out),
            },
            other => other.write_to(&mut out),
        }
    }
    out
}

fn is_named_start(bytes: &[u8], i: usize) -> bool {
    let prev_ok = i == 0 || bytes[i - 1] != b':';
    let next_ok = bytes.get(i + 1).is_some_and(|b| is_ident_start(*b));
    prev_ok && next_ok
}

fn scan_while(bytes: &[u8], start: usize, pred: impl Fn(u8) -> bool) -> usize {
    let mut end = start;
    while end < bytes.len() && pred(bytes[end]) {
        end += 1;
    }
    end
}

/// End (exclusive) of the literal opening at `start`; unterminated literals run to the end.
fn literal_end(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        if bytes[i] == b'\'' {
            if bytes.get(i + 1) == Some(&b'\'') {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenizes_placeholders_and_literals() {
        let tokens = tokenize("a = $1 AND b = 'x$2' AND c = :name");
        assert_eq!(
            tokens,
            vec![
                Token::Text("a = "),
                Token::Positional(1),
                Token::Text(" AND b = "),
                Token::Literal("'x$2'"),
                Token::Text(" AND c = "),
                Token::Named("name"),
            ]
        );
    }

    #[test]
    fn test_casts_and_assignments_are_text() {
        let tokens = tokenize("x::uuid, _email:=:email");
        assert_eq!(
            tokens,
            vec![Token::Text("x::uuid, _email:="), Token::Named("email")]
        );
    }

    #[test]
    fn test_doubled_quotes_stay_in_literal() {
        let tokens = tokenize("'it''s $1' || $1");
        assert_eq!(
            tokens,
            vec![
                Token::Literal("'it''s $1'"),
                Token::Text(" || "),
                Token::Positional(1),
            ]
        );
    }

    #[test]
    fn test_dollar_inside_identifiers_is_text() {
        assert_eq!(tokenize("col$1"), vec![Token::Text("col$1")]);
        assert_eq!(tokenize("$1abc"), vec![Token::Text("$1abc")]);
        assert_eq!(tokenize("$"), vec![Token::Text("$")]);
    }

    #[test]
    fn test_unterminated_literal_runs_to_end() {
        assert_eq!(
            tokenize("a = 'open $1"),
            vec![Token::Text("a = "), Token::Literal("'open $1")]
        );
    }

    #[test]
    fn test_renumber_skips_literals_and_zero() {
        assert_eq!(
            renumber("name = $1 AND note = '$1 special' AND x = $2", 3),
            "name = $4 AND note = '$1 special' AND x = $5"
        );
        assert_eq!(renumber("$0", 2), "$0");
        assert_eq!(renumber("no placeholders", 9), "no placeholders");
    }

    #[test]
    fn test_renumber_leaves_overflowing_placeholder() {
        let max = format!("b = ${}", usize::MAX);
        assert_eq!(renumber(&max, 1), max);
    }

    #[test]
    fn test_round_trips_unchanged_text() {
        let sql = "SELECT 'a'':b', x::int FROM t WHERE y = :y AND z = $3";
        let mut out = String::new();
        for token in tokenize(sql) {
            token.write_to(&mut out);
        }
        assert_eq!(out, sql);
    }
}
