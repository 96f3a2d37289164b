//! Filter types for declarative query conditions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::types::value::ValueType;

/// Filter comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    /// Exact equality.
    Eq,
    /// Not equal.
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Case-insensitive substring match.
    Like,
    /// Membership in a comma-separated list.
    In,
    /// `IS NULL`
    IsNull,
    /// `IS NOT NULL`
    IsNotNull,
    /// `IS TRUE`
    IsTrue,
    /// `IS FALSE`
    IsFalse,
}

impl FilterOp {
    /// Every operator, in declaration order.
    pub const ALL: [FilterOp; 12] = [
        Self::Eq,
        Self::Ne,
        Self::Gt,
        Self::Gte,
        Self::Lt,
        Self::Lte,
        Self::Like,
        Self::In,
        Self::IsNull,
        Self::IsNotNull,
        Self::IsTrue,
        Self::IsFalse,
    ];

    /// The query-string spelling of this operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Like => "like",
            Self::In => "in",
            Self::IsNull => "is_null",
            Self::IsNotNull => "is_not_null",
            Self::IsTrue => "is_true",
            Self::IsFalse => "is_false",
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterOp {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| AppError::validation(format!("unknown filter operation '{s}'")))
    }
}

/// A runtime filter request: field, operation, raw value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    /// API-facing field name.
    pub field: String,
    /// Requested operation.
    pub op: FilterOp,
    /// Raw, untyped value as received.
    #[serde(default)]
    pub value: String,
}

impl Condition {
    /// Create a new condition.
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// Shorthand for an equality condition.
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field, FilterOp::Eq, value)
    }
}

/// Declares a filterable field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRule {
    /// API-facing field name matched against [`Condition::field`].
    pub field: String,
    /// Backend column the predicate is written against.
    pub column: String,
    /// Permitted operations.
    pub ops: Vec<FilterOp>,
    /// Type the raw value is coerced to.
    pub value_type: ValueType,
    /// Whether the literal `null` means SQL NULL.
    #[serde(default)]
    pub allow_null: bool,
}

impl FilterRule {
    /// Create a rule whose field name and column are the same.
    pub fn new(field: impl Into<String>, value_type: ValueType, ops: &[FilterOp]) -> Self {
        let field = field.into();
        Self {
            column: field.clone(),
            field,
            ops: ops.to_vec(),
            value_type,
            allow_null: false,
        }
    }

    /// Write predicates against `column` instead of the field name.
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }

    /// Accept the literal `null` as SQL NULL.
    pub fn nullable(mut self) -> Self {
        self.allow_null = true;
        self
    }

    /// Whether `op` is permitted on this field.
    pub fn permits(&self, op: FilterOp) -> bool {
        self.ops.contains(&op)
    }
}
