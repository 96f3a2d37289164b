//! Typed SQL values.
//!
//! A [`SqlValue`] is a single bindable value. Every variant carries an
//! `Option` so that a NULL still knows its SQL type; Postgres rejects an
//! untyped NULL parameter compared against a typed column.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use uuid::Uuid;

/// Declared type of a filterable or sortable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    /// Text.
    String,
    /// 64-bit signed integer.
    Integer,
    /// Decimal number, bound as double precision.
    Decimal,
    /// Calendar date written `YYYY-MM-DD`.
    Date,
    /// Timestamp; filter literals are Unix seconds.
    Timestamp,
    /// Timestamp; filter literals are Unix milliseconds.
    TimestampMillis,
    /// Boolean.
    Boolean,
    /// UUID.
    Uuid,
    /// JSON document.
    Json,
}

/// A single bindable SQL value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// `text`
    Text(Option<String>),
    /// `int8`
    Int(Option<i64>),
    /// `float8`
    Float(Option<f64>),
    /// `bool`
    Bool(Option<bool>),
    /// `date`
    Date(Option<NaiveDate>),
    /// `timestamptz`
    Timestamp(Option<DateTime<Utc>>),
    /// `uuid`
    Uuid(Option<Uuid>),
    /// `jsonb`
    Json(Option<Json>),
}

impl SqlValue {
    /// A typed NULL for `ty`.
    pub fn null(ty: ValueType) -> Self {
        match ty {
            ValueType::String => Self::Text(None),
            ValueType::Integer => Self::Int(None),
            ValueType::Decimal => Self::Float(None),
            ValueType::Date => Self::Date(None),
            ValueType::Timestamp | ValueType::TimestampMillis => Self::Timestamp(None),
            ValueType::Boolean => Self::Bool(None),
            ValueType::Uuid => Self::Uuid(None),
            ValueType::Json => Self::Json(None),
        }
    }

    /// The zero value of `ty`, for the types that have one.
    pub fn zero(ty: ValueType) -> Option<Self> {
        match ty {
            ValueType::String => Some(Self::Text(Some(String::new()))),
            ValueType::Integer => Some(Self::Int(Some(0))),
            ValueType::Decimal => Some(Self::Float(Some(0.0))),
            _ => None,
        }
    }

    /// Whether this value is SQL NULL.
    pub fn is_null(&self) -> bool {
        match self {
            Self::Text(v) => v.is_none(),
            Self::Int(v) => v.is_none(),
            Self::Float(v) => v.is_none(),
            Self::Bool(v) => v.is_none(),
            Self::Date(v) => v.is_none(),
            Self::Timestamp(v) => v.is_none(),
            Self::Uuid(v) => v.is_none(),
            Self::Json(v) => v.is_none(),
        }
    }

    /// Whether this value counts as "absent" in a cursor: NULL, the empty
    /// string, or numeric zero. Booleans, dates and timestamps have no zero.
    pub fn is_zero(&self) -> bool {
        match self {
            Self::Text(Some(s)) => s.is_empty(),
            Self::Int(Some(i)) => *i == 0,
            Self::Float(Some(f)) => *f == 0.0,
            Self::Json(Some(j)) => j.is_null(),
            other => other.is_null(),
        }
    }

    /// Render as a JSON value for cursor encoding.
    pub fn to_json(&self) -> Json {
        match self {
            Self::Text(Some(s)) => Json::String(s.clone()),
            Self::Int(Some(i)) => Json::from(*i),
            Self::Float(Some(f)) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Self::Bool(Some(b)) => Json::Bool(*b),
            Self::Date(Some(d)) => Json::String(d.format("%Y-%m-%d").to_string()),
            Self::Timestamp(Some(ts)) => {
                Json::String(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Self::Uuid(Some(u)) => Json::String(u.to_string()),
            Self::Json(Some(j)) => j.clone(),
            _ => Json::Null,
        }
    }

    /// Read a JSON value back as `ty`. Returns `None` when the JSON shape does
    /// not fit the type. JSON null always yields a typed NULL.
    pub fn from_json(ty: ValueType, value: &Json) -> Option<Self> {
        if value.is_null() {
            return Some(Self::null(ty));
        }
        let parsed = match ty {
            ValueType::String => Self::Text(Some(value.as_str()?.to_string())),
            ValueType::Integer => Self::Int(Some(value.as_i64()?)),
            ValueType::Decimal => Self::Float(Some(value.as_f64()?)),
            ValueType::Boolean => Self::Bool(Some(value.as_bool()?)),
            ValueType::Date => Self::Date(Some(
                NaiveDate::parse_from_str(value.as_str()?, "%Y-%m-%d").ok()?,
            )),
            ValueType::Timestamp | ValueType::TimestampMillis => Self::Timestamp(Some(
                DateTime::parse_from_rfc3339(value.as_str()?)
                    .ok()?
                    .with_timezone(&Utc),
            )),
            ValueType::Uuid => Self::Uuid(Some(Uuid::parse_str(value.as_str()?).ok()?)),
            ValueType::Json => Self::Json(Some(value.clone())),
        };
        Some(parsed)
    }
}

macro_rules! impl_from_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for SqlValue {
                fn from(value: $ty) -> Self {
                    Self::$variant(Some(value.into()))
                }
            }

            impl From<Option<$ty>> for SqlValue {
                fn from(value: Option<$ty>) -> Self {
                    Self::$variant(value.map(Into::into))
                }
            }
        )*
    };
}

impl_from_value! {
    String => Text,
    &str => Text,
    i64 => Int,
    i32 => Int,
    f64 => Float,
    bool => Bool,
    NaiveDate => Date,
    DateTime<Utc> => Timestamp,
    Uuid => Uuid,
    Json => Json,
}
