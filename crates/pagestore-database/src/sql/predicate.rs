//! Composable WHERE-clause predicates.

use pagestore_core::types::SqlValue;

use super::statement::SqlWriter;

/// Left-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A column or trusted SQL expression.
    Column(String),
    /// `COALESCE(expr, value)`
    Coalesce(String, SqlValue),
}

impl Operand {
    pub(crate) fn write(&self, w: &mut SqlWriter) {
        match self {
            Self::Column(expr) => {
                w.push(expr);
            }
            Self::Coalesce(expr, value) => {
                w.push("COALESCE(").push(expr).push(", ");
                w.bind(value.clone()).push(")");
            }
        }
    }
}

/// Binary comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `<`
    Lt,
    /// `<=`
    Lte,
}

impl CompareOp {
    /// SQL spelling.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
        }
    }
}

/// A boolean SQL expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `left op $n`
    Compare {
        /// Compared expression.
        left: Operand,
        /// Operator.
        op: CompareOp,
        /// Bound value.
        value: SqlValue,
    },
    /// `column ILIKE $n`
    ILike {
        /// Matched column.
        column: String,
        /// Full LIKE pattern.
        pattern: String,
    },
    /// `column IN ($1, ...)`
    In {
        /// Matched column.
        column: String,
        /// Candidate values.
        values: Vec<SqlValue>,
    },
    /// `column IS NULL`
    IsNull(String),
    /// `column IS NOT NULL`
    IsNotNull(String),
    /// `column IS TRUE`
    IsTrue(String),
    /// `column IS FALSE`
    IsFalse(String),
    /// Conjunction; empty is `TRUE`.
    And(Vec<Predicate>),
    /// Disjunction; empty is `FALSE`.
    Or(Vec<Predicate>),
}

impl Predicate {
    /// Matches every row.
    pub fn all() -> Self {
        Self::And(Vec::new())
    }

    /// `left op value`
    pub fn compare(left: Operand, op: CompareOp, value: impl Into<SqlValue>) -> Self {
        Self::Compare {
            left,
            op,
            value: value.into(),
        }
    }

    /// `column = value`
    pub fn eq(column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Self::compare(Operand::Column(column.into()), CompareOp::Eq, value)
    }

    /// `column > value`
    pub fn gt(column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Self::compare(Operand::Column(column.into()), CompareOp::Gt, value)
    }

    /// Case-insensitive substring match. LIKE wildcards in `needle` are
    /// escaped so they match literally.
    pub fn contains(column: impl Into<String>, needle: &str) -> Self {
        let mut pattern = String::with_capacity(needle.len() + 2);
        pattern.push('%');
        for ch in needle.chars() {
            if matches!(ch, '%' | '_' | '\\') {
                pattern.push('\\');
            }
            pattern.push(ch);
        }
        pattern.push('%');
        Self::ILike {
            column: column.into(),
            pattern,
        }
    }

    /// `column IN (values)`
    pub fn in_list<V: Into<SqlValue>>(
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// `column IS NULL`
    pub fn is_null(column: impl Into<String>) -> Self {
        Self::IsNull(column.into())
    }

    /// `column IS NOT NULL`
    pub fn is_not_null(column: impl Into<String>) -> Self {
        Self::IsNotNull(column.into())
    }

    /// Conjunction of `predicates`, flattening nested conjunctions.
    pub fn and(predicates: Vec<Predicate>) -> Self {
        let mut flat = Vec::with_capacity(predicates.len());
        for p in predicates {
            match p {
                Self::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        Self::And(flat)
    }

    /// Disjunction of `predicates`.
    pub fn or(predicates: Vec<Predicate>) -> Self {
        Self::Or(predicates)
    }

    /// Whether this is the always-true empty conjunction.
    pub fn is_trivial(&self) -> bool {
        matches!(self, Self::And(v) if v.is_empty())
    }

    /// Render into `w`.
    pub fn write(&self, w: &mut SqlWriter) {
        match self {
            Self::Compare { left, op, value } => {
                left.write(w);
                w.push(" ").push(op.as_sql()).push(" ");
                w.bind(value.clone());
            }
            Self::ILike { column, pattern } => {
                w.push(column).push(" ILIKE ");
                w.bind(SqlValue::from(pattern.as_str()));
            }
            Self::In { column, values } => {
                if values.is_empty() {
                    w.push("FALSE");
                    return;
                }
                w.push(column).push(" IN (");
                w.join(values, ", ", |w, v| {
                    w.bind(v.clone());
                });
                w.push(")");
            }
            Self::IsNull(column) => {
                w.push(column).push(" IS NULL");
            }
            Self::IsNotNull(column) => {
                w.push(column).push(" IS NOT NULL");
            }
            Self::IsTrue(column) => {
                w.push(column).push(" IS TRUE");
            }
            Self::IsFalse(column) => {
                w.push(column).push(" IS FALSE");
            }
            Self::And(items) => write_group(w, items, " AND ", "TRUE"),
            Self::Or(items) => write_group(w, items, " OR ", "FALSE"),
        }
    }
}

fn write_group(w: &mut SqlWriter, items: &[Predicate], sep: &str, empty: &str) {
    match items {
        [] => {
            w.push(empty);
        }
        [single] => single.write(w),
        _ => {
            w.push("(");
            w.join(items, sep, |w, p| p.write(w));
            w.push(")");
        }
    }
}
