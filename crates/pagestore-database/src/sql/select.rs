//! SELECT and COUNT statements over one table.

use pagestore_core::types::{SortDirection, SqlValue};

use super::predicate::{Operand, Predicate};
use super::statement::{SqlWriter, Statement};

/// One `ORDER BY` term.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderTerm {
    /// Sorted expression.
    pub operand: Operand,
    /// Direction.
    pub direction: SortDirection,
}

/// A single-table query.
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    table: String,
    filters: Vec<Predicate>,
    order_by: Vec<OrderTerm>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl Select {
    /// `SELECT * FROM table`
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filters: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// AND `predicate` into the WHERE clause. Trivial predicates are dropped.
    pub fn filter(&mut self, predicate: Predicate) -> &mut Self {
        if !predicate.is_trivial() {
            self.filters.push(predicate);
        }
        self
    }

    /// Append an ORDER BY term.
    pub fn order_by(&mut self, operand: Operand, direction: SortDirection) -> &mut Self {
        self.order_by.push(OrderTerm { operand, direction });
        self
    }

    /// Set LIMIT.
    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    /// Set OFFSET.
    pub fn offset(&mut self, offset: u64) -> &mut Self {
        self.offset = Some(offset);
        self
    }

    /// Render the row query.
    pub fn statement(&self) -> Statement {
        let mut w = SqlWriter::new();
        w.push("SELECT * FROM ").push(&self.table);
        self.write_where(&mut w);
        if !self.order_by.is_empty() {
            w.push(" ORDER BY ");
            w.join(&self.order_by, ", ", |w, term| {
                term.operand.write(w);
                w.push(" ").push(term.direction.as_sql());
            });
        }
        if let Some(limit) = self.limit {
            w.push(" LIMIT ").bind(SqlValue::from(to_i64(limit)));
        }
        if let Some(offset) = self.offset {
            w.push(" OFFSET ").bind(SqlValue::from(to_i64(offset)));
        }
        w.finish()
    }

    /// Render `SELECT COUNT(*)` over the same filters, ignoring order and paging.
    pub fn count_statement(&self) -> Statement {
        let mut w = SqlWriter::new();
        w.push("SELECT COUNT(*) FROM ").push(&self.table);
        self.write_where(&mut w);
        w.finish()
    }

    fn write_where(&self, w: &mut SqlWriter) {
        if self.filters.is_empty() {
            return;
        }
        w.push(" WHERE ");
        w.join(&self.filters, " AND ", |w, p| p.write(w));
    }
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
