//! Compiles declarative filter conditions into a [`Predicate`].
//!
//! Every condition is checked against the allow-list of [`FilterRule`]s. All
//! conditions are attempted; failures are collected and returned together as
//! one validation error whose `details` name each bad field.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use uuid::Uuid;

use pagestore_core::error::AppError;
use pagestore_core::result::AppResult;
use pagestore_core::types::{Condition, FilterOp, FilterRule, SqlValue, ValueType};

use crate::sql::{CompareOp, Operand, Predicate};

static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date pattern is valid"));

/// Filter compiler.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterCompiler {
    reject_unknown: bool,
}

impl FilterCompiler {
    /// A compiler that drops conditions on unregistered fields.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject conditions on unregistered fields instead of dropping them.
    pub fn reject_unknown(mut self, reject: bool) -> Self {
        self.reject_unknown = reject;
        self
    }

    /// AND together the predicates of every condition.
    pub fn compile(&self, conditions: &[Condition], rules: &[FilterRule]) -> AppResult<Predicate> {
        let mut predicates = Vec::with_capacity(conditions.len());
        let mut problems = Vec::new();

        for condition in conditions {
            let Some(rule) = rules.iter().find(|r| r.field == condition.field) else {
                if self.reject_unknown {
                    problems.push(format!("field '{}' is not filterable", condition.field));
                }
                continue;
            };
            if !rule.permits(condition.op) {
                problems.push(format!(
                    "field '{}' does not support operation '{}'",
                    condition.field, condition.op
                ));
                continue;
            }
            match compile_condition(rule, condition) {
                Ok(predicate) => predicates.push(predicate),
                Err(reason) => problems.push(format!("field '{}': {reason}", condition.field)),
            }
        }

        if !problems.is_empty() {
            return Err(
                AppError::validation(format!("invalid filter: {}", problems.join("; ")))
                    .with_details(problems),
            );
        }
        Ok(Predicate::and(predicates))
    }
}

fn compile_condition(rule: &FilterRule, condition: &Condition) -> Result<Predicate, String> {
    let column = rule.column.clone();
    let raw = condition.value.as_str();

    let op = match condition.op {
        FilterOp::IsNull => return Ok(Predicate::IsNull(column)),
        FilterOp::IsNotNull => return Ok(Predicate::IsNotNull(column)),
        FilterOp::IsTrue => return Ok(Predicate::IsTrue(column)),
        FilterOp::IsFalse => return Ok(Predicate::IsFalse(column)),
        FilterOp::Like => {
            if rule.value_type != ValueType::String {
                return Err("'like' requires a string field".to_string());
            }
            return Ok(Predicate::contains(column, raw));
        }
        FilterOp::In => {
            let values = raw
                .split(',')
                .map(|part| parse_value(rule.value_type, part.trim()))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Predicate::In { column, values });
        }
        FilterOp::Eq => CompareOp::Eq,
        FilterOp::Ne => CompareOp::Ne,
        FilterOp::Gt => CompareOp::Gt,
        FilterOp::Gte => CompareOp::Gte,
        FilterOp::Lt => CompareOp::Lt,
        FilterOp::Lte => CompareOp::Lte,
    };

    if rule.allow_null && raw.eq_ignore_ascii_case("null") {
        return match op {
            CompareOp::Eq => Ok(Predicate::IsNull(column)),
            CompareOp::Ne => Ok(Predicate::IsNotNull(column)),
            _ => Err("null can only be compared with 'eq' or 'ne'".to_string()),
        };
    }

    let value = parse_value(rule.value_type, raw)?;
    Ok(Predicate::compare(Operand::Column(column), op, value))
}

/// Coerce a raw filter literal into `ty`.
pub fn parse_value(ty: ValueType, raw: &str) -> Result<SqlValue, String> {
    match ty {
        ValueType::String => Ok(SqlValue::from(raw)),
        ValueType::Integer => raw
            .parse::<i64>()
            .map(SqlValue::from)
            .map_err(|_| format!("'{raw}' is not an integer")),
        ValueType::Decimal => match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(SqlValue::from(v)),
            _ => Err(format!("'{raw}' is not a decimal number")),
        },
        ValueType::Boolean => parse_bool(raw)
            .map(SqlValue::from)
            .ok_or_else(|| format!("'{raw}' is not a boolean")),
        ValueType::Date => {
            if !DATE_PATTERN.is_match(raw) {
                return Err(format!("'{raw}' is not a date in YYYY-MM-DD form"));
            }
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map(SqlValue::from)
                .map_err(|_| format!("'{raw}' is not a valid date"))
        }
        ValueType::Timestamp => raw
            .parse::<i64>()
            .ok()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .map(SqlValue::from)
            .ok_or_else(|| format!("'{raw}' is not a Unix timestamp in seconds")),
        ValueType::TimestampMillis => raw
            .parse::<i64>()
            .ok()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(SqlValue::from)
            .ok_or_else(|| format!("'{raw}' is not a Unix timestamp in milliseconds")),
        ValueType::Uuid => Uuid::parse_str(raw)
            .map(SqlValue::from)
            .map_err(|_| format!("'{raw}' is not a UUID")),
        ValueType::Json => serde_json::from_str::<serde_json::Value>(raw)
            .map(SqlValue::from)
            .map_err(|_| format!("'{raw}' is not valid JSON")),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}
