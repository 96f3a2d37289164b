//! Pagination types for list requests and responses.

use serde::{Deserialize, Serialize};

use crate::types::filter::Condition;
use crate::types::sorting::SortDirection;
use crate::types::value::{SqlValue, ValueType};

/// A continuation point for cursor pagination.
///
/// Externally a cursor is a pair of optional `after`/`before` tokens; use
/// [`Cursor::from_parts`] to fold that pair into this type.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cursor {
    /// Start from the beginning.
    #[default]
    None,
    /// Continue after the row the token was encoded from.
    After(String),
    /// Continue before the row the token was encoded from.
    Before(String),
}

impl Cursor {
    /// Build a cursor from API query parameters. Empty strings count as
    /// absent and `after` wins when both are present.
    pub fn from_parts(after: Option<String>, before: Option<String>) -> Self {
        match (after.filter(|s| !s.is_empty()), before.filter(|s| !s.is_empty())) {
            (Some(after), _) => Self::After(after),
            (None, Some(before)) => Self::Before(before),
            (None, None) => Self::None,
        }
    }

    /// Whether this cursor walks backward.
    pub fn is_backward(&self) -> bool {
        matches!(self, Self::Before(_))
    }

    /// The encoded token, if any.
    pub fn token(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::After(token) | Self::Before(token) => Some(token),
        }
    }
}

/// Reads a cursor key from inside a JSON field.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomType {
    /// Object key within the field's JSON value.
    pub meta: String,
    /// Type of the value stored under `meta`.
    pub value_type: ValueType,
}

/// Declares one sortable key.
#[derive(Debug, Clone, PartialEq)]
pub struct PaginationRule {
    /// Logical field name on the record schema.
    pub key: String,
    /// SQL expression to sort on; the schema column when unset.
    pub sql_repr: Option<String>,
    /// Direction for this key; the request's order when unset.
    pub order: Option<SortDirection>,
    /// Value substituted for NULL in both ordering and cursor comparison.
    pub null_replacement: Option<SqlValue>,
    /// Override for keys stored inside a JSON field.
    pub custom_type: Option<CustomType>,
}

impl PaginationRule {
    /// Create a rule on `key` with every option unset.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            sql_repr: None,
            order: None,
            null_replacement: None,
            custom_type: None,
        }
    }

    /// Sort on a custom SQL expression.
    pub fn sql_repr(mut self, sql: impl Into<String>) -> Self {
        self.sql_repr = Some(sql.into());
        self
    }

    /// Fix the direction for this key.
    pub fn order(mut self, order: SortDirection) -> Self {
        self.order = Some(order);
        self
    }

    /// Replace NULL keys with `value`.
    pub fn null_replacement(mut self, value: impl Into<SqlValue>) -> Self {
        self.null_replacement = Some(value.into());
        self
    }

    /// Read the cursor value from `meta` inside a JSON field.
    pub fn custom_type(mut self, meta: impl Into<String>, value_type: ValueType) -> Self {
        self.custom_type = Some(CustomType {
            meta: meta.into(),
            value_type,
        });
        self
    }
}

/// Pagination mode of one list request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageMode {
    /// Keyset pagination.
    Cursor(Cursor),
    /// Page-number pagination (1-based).
    Offset {
        /// Page number.
        page: u64,
    },
}

impl Default for PageMode {
    fn default() -> Self {
        Self::Cursor(Cursor::None)
    }
}

/// Options for one list call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Ad-hoc filter conditions.
    pub conditions: Vec<Condition>,
    /// Cursor or page selection.
    pub mode: PageMode,
    /// Items per page; the store default when unset.
    pub limit: Option<u64>,
    /// Direction for pagination rules that do not declare one.
    pub order: Option<SortDirection>,
    /// Relations to attach after the base query.
    pub includes: Vec<String>,
}

impl ListOptions {
    /// Empty options: first cursor page, default limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter condition.
    pub fn condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Replace the filter conditions.
    pub fn conditions(mut self, conditions: Vec<Condition>) -> Self {
        self.conditions = conditions;
        self
    }

    /// Use cursor mode from `cursor`.
    pub fn cursor(mut self, cursor: Cursor) -> Self {
        self.mode = PageMode::Cursor(cursor);
        self
    }

    /// Continue after `token`.
    pub fn after(self, token: impl Into<String>) -> Self {
        self.cursor(Cursor::After(token.into()))
    }

    /// Continue before `token`.
    pub fn before(self, token: impl Into<String>) -> Self {
        self.cursor(Cursor::Before(token.into()))
    }

    /// Use offset mode at `page`.
    pub fn page(mut self, page: u64) -> Self {
        self.mode = PageMode::Offset { page };
        self
    }

    /// Set the page size.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the default direction.
    pub fn order(mut self, order: SortDirection) -> Self {
        self.order = Some(order);
        self
    }

    /// Request a relation by name.
    pub fn include(mut self, name: impl Into<String>) -> Self {
        self.includes.push(name.into());
        self
    }
}

/// Pagination metadata of a list response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PageInfo {
    /// Keyset continuation tokens.
    Cursor {
        /// Token for the following page.
        next_cursor: Option<String>,
        /// Token for the preceding page.
        prev_cursor: Option<String>,
    },
    /// Page-number metadata.
    Offset {
        /// Current page number (1-based).
        current_page: u64,
        /// Last page number, `ceil(total / records_per_page)`.
        max_page: u64,
        /// Total number of matching rows.
        total: u64,
        /// Items per page.
        records_per_page: u64,
    },
}

impl PageInfo {
    /// Metadata of a cursor page with no tokens.
    pub fn empty_cursor() -> Self {
        Self::Cursor {
            next_cursor: None,
            prev_cursor: None,
        }
    }

    /// Build offset metadata, deriving the max page.
    pub fn offset(current_page: u64, records_per_page: u64, total: u64) -> Self {
        Self::Offset {
            current_page,
            max_page: total.div_ceil(records_per_page.max(1)),
            total,
            records_per_page,
        }
    }
}

/// One page of records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResult<T> {
    /// The records on this page, in the requested order.
    pub items: Vec<T>,
    /// Cursor or offset metadata.
    pub pagination: PageInfo,
}

impl<T> ListResult<T> {
    /// The mode that fetches the following page, or `None` on the last page.
    pub fn next(&self) -> Option<PageMode> {
        match &self.pagination {
            PageInfo::Cursor { next_cursor, .. } => next_cursor
                .clone()
                .map(|token| PageMode::Cursor(Cursor::After(token))),
            PageInfo::Offset {
                current_page,
                max_page,
                ..
            } => (current_page < max_page).then(|| PageMode::Offset {
                page: current_page + 1,
            }),
        }
    }

    /// Transform the records, keeping the metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> ListResult<U> {
        ListResult {
            items: self.items.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}
