//! INSERT, UPDATE and DELETE statements.

use pagestore_core::types::SqlValue;

use super::predicate::Predicate;
use super::statement::{SqlWriter, Statement};

/// `INSERT ... [ON CONFLICT ...] [RETURNING ...]`
#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    table: String,
    values: Vec<(String, SqlValue)>,
    conflict: Option<(Vec<String>, Vec<String>)>,
    returning: Vec<String>,
}

impl Insert {
    /// Insert into `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            values: Vec::new(),
            conflict: None,
            returning: Vec::new(),
        }
    }

    /// Add a column value.
    pub fn value(mut self, column: impl Into<String>, value: SqlValue) -> Self {
        self.values.push((column.into(), value));
        self
    }

    /// On conflict over `target`, overwrite `update` from the proposed row.
    /// An empty `update` list turns the conflict into a no-op update of the
    /// first target column so that `RETURNING` still yields the row.
    pub fn on_conflict_update(mut self, target: Vec<String>, update: Vec<String>) -> Self {
        self.conflict = Some((target, update));
        self
    }

    /// Add a `RETURNING` expression.
    pub fn returning(mut self, expr: impl Into<String>) -> Self {
        self.returning.push(expr.into());
        self
    }

    /// Render.
    pub fn statement(self) -> Statement {
        let mut w = SqlWriter::new();
        let (columns, values): (Vec<String>, Vec<SqlValue>) = self.values.into_iter().unzip();
        w.push("INSERT INTO ").push(&self.table).push(" (");
        w.join(&columns, ", ", |w, c| {
            w.push(c);
        });
        w.push(") VALUES (");
        w.join(values, ", ", |w, v| {
            w.bind(v);
        });
        w.push(")");

        if let Some((target, update)) = &self.conflict {
            w.push(" ON CONFLICT (");
            w.join(target, ", ", |w, c| {
                w.push(c);
            });
            w.push(") DO UPDATE SET ");
            let update = if update.is_empty() {
                &target[..1.min(target.len())]
            } else {
                &update[..]
            };
            w.join(update, ", ", |w, c| {
                w.push(c).push(" = EXCLUDED.").push(c);
            });
        }

        if !self.returning.is_empty() {
            w.push(" RETURNING ");
            w.join(&self.returning, ", ", |w, r| {
                w.push(r);
            });
        }
        w.finish()
    }
}

/// `UPDATE table SET ... WHERE ...`
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    table: String,
    sets: Vec<(String, SqlValue)>,
    filter: Predicate,
}

impl Update {
    /// Update rows of `table` matching `filter`.
    pub fn new(table: impl Into<String>, filter: Predicate) -> Self {
        Self {
            table: table.into(),
            sets: Vec::new(),
            filter,
        }
    }

    /// Add `column = value`.
    pub fn set(mut self, column: impl Into<String>, value: SqlValue) -> Self {
        self.sets.push((column.into(), value));
        self
    }

    /// Render.
    pub fn statement(self) -> Statement {
        let mut w = SqlWriter::new();
        w.push("UPDATE ").push(&self.table).push(" SET ");
        w.join(self.sets, ", ", |w, (column, value)| {
            w.push(&column).push(" = ").bind(value);
        });
        w.push(" WHERE ");
        self.filter.write(&mut w);
        w.finish()
    }
}

/// `DELETE FROM table WHERE ...`
#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    table: String,
    filter: Predicate,
}

impl Delete {
    /// Delete rows of `table` matching `filter`.
    pub fn new(table: impl Into<String>, filter: Predicate) -> Self {
        Self {
            table: table.into(),
            filter,
        }
    }

    /// Render.
    pub fn statement(self) -> Statement {
        let mut w = SqlWriter::new();
        w.push("DELETE FROM ").push(&self.table).push(" WHERE ");
        self.filter.write(&mut w);
        w.finish()
    }
}
