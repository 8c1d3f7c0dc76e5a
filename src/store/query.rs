//! Read-only execution of generated SQL.
//!
//! Three independent guards stand between model output and the data:
//!
//! * the connection is opened with `SQLITE_OPEN_READ_ONLY` and `query_only`
//! * exactly one statement is accepted; anything after the first `;` that is
//!   not whitespace or a comment is rejected
//! * SQLite's own `sqlite3_stmt_readonly` verdict must be true

use super::Store;
use crate::error::InvoiceError;
use rusqlite::types::ValueRef;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Tabular result of a read-only query.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All values of one column, by name.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().filter_map(|r| r.get(idx)).collect())
    }
}

impl Store {
    /// Run one statement that is guaranteed not to modify the database.
    pub fn run_read_only(&self, sql: &str) -> Result<QueryResult, InvoiceError> {
        let statement = single_statement(sql)?;
        debug!("read-only query: {}", statement);

        let conn = self.connect_read_only()?;
        let mut stmt = conn.prepare(statement).map_err(|e| InvoiceError::QueryFailed {
            detail: e.to_string(),
        })?;

        if !stmt.readonly() {
            warn!("Rejected non read-only statement");
            return Err(InvoiceError::ReadOnlyViolation {
                sql: statement.to_string(),
            });
        }

        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let width = columns.len();

        let mut rows = stmt.query([]).map_err(query_failed)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(query_failed)? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(to_json(row.get_ref(i).map_err(query_failed)?));
            }
            out.push(values);
        }

        Ok(QueryResult { columns, rows: out })
    }
}

fn query_failed(e: rusqlite::Error) -> InvoiceError {
    InvoiceError::QueryFailed {
        detail: e.to_string(),
    }
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(format!("<{} bytes>", b.len())),
    }
}

/// Trim `sql` to its single statement, without the trailing `;`.
///
/// Quotes (`'…'`, `"…"`, `` `…` ``, `[…]`) and comments are skipped when
/// looking for the terminator.
fn single_statement(sql: &str) -> Result<&str, InvoiceError> {
    let trimmed = sql.trim();
    if trimmed.is_empty() {
        return Err(InvoiceError::EmptyQuery);
    }

    let bytes = trimmed.as_bytes();
    let mut i = 0;
    let mut end = None;
    while i < bytes.len() {
        match bytes[i] {
            q @ (b'\'' | b'"' | b'`') => {
                i += 1;
                while i < bytes.len() {
                    if bytes[i] == q {
                        // Doubled quote is an escaped quote.
                        if bytes.get(i + 1) == Some(&q) {
                            i += 2;
                            continue;
                        }
                        break;
                    }
                    i += 1;
                }
            }
            b'[' => {
                while i < bytes.len() && bytes[i] != b']' {
                    i += 1;
                }
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i < bytes.len() && !(bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/')) {
                    i += 1;
                }
                i += 1;
            }
            b';' => {
                end = Some(i);
                break;
            }
            _ => {}
        }
        i += 1;
    }

    let Some(end) = end else {
        return Ok(trimmed);
    };
    if !is_blank(&trimmed[end + 1..]) {
        return Err(InvoiceError::ReadOnlyViolation {
            sql: trimmed.to_string(),
        });
    }
    let statement = trimmed[..end].trim();
    if statement.is_empty() {
        return Err(InvoiceError::EmptyQuery);
    }
    Ok(statement)
}

/// Only whitespace, `;` and comments.
fn is_blank(rest: &str) -> bool {
    let mut s = rest.trim_start();
    loop {
        if s.is_empty() {
            return true;
        }
        if let Some(r) = s.strip_prefix(';') {
            s = r.trim_start();
        } else if let Some(r) = s.strip_prefix("--") {
            s = r.split_once('\n').map(|(_, tail)| tail).unwrap_or("").trim_start();
        } else if let Some(r) = s.strip_prefix("/*") {
            match r.split_once("*/") {
                Some((_, tail)) => s = tail.trim_start(),
                None => return true,
            }
        } else {
            return false;
        }
    }
}
