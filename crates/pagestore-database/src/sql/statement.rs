//! Rendered statements and the writer that produces them.

use std::fmt::Write as _;

use pagestore_core::types::SqlValue;

/// SQL text with its positional bind values.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// SQL with `$1..$n` placeholders.
    pub sql: String,
    /// Values for the placeholders, in order.
    pub values: Vec<SqlValue>,
}

impl Statement {
    /// A statement without bind values.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            values: Vec::new(),
        }
    }
}

/// Accumulates SQL text and numbers placeholders as values are bound.
#[derive(Debug, Default)]
pub struct SqlWriter {
    sql: String,
    values: Vec<SqlValue>,
}

impl SqlWriter {
    /// An empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw SQL.
    pub fn push(&mut self, sql: &str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    /// Append a placeholder for `value`.
    pub fn bind(&mut self, value: SqlValue) -> &mut Self {
        self.values.push(value);
        let _ = write!(self.sql, "${}", self.values.len());
        self
    }

    /// Append `items` separated by `sep`, writing each with `f`.
    pub fn join<I, F>(&mut self, items: I, sep: &str, mut f: F) -> &mut Self
    where
        I: IntoIterator,
        F: FnMut(&mut Self, I::Item),
    {
        for (i, item) in items.into_iter().enumerate() {
            if i > 0 {
                self.push(sep);
            }
            f(self, item);
        }
        self
    }

    /// Finish into a statement.
    pub fn finish(self) -> Statement {
        Statement {
            sql: self.sql,
            values: self.values,
        }
    }
}
