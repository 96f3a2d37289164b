//! Cursor token codec.
//!
//! A token is the standard-alphabet base64 encoding of a JSON array holding
//! the pagination key values of one row, in rule order. Zero values are
//! written as JSON `null` so a decoder can tell "absent" from a real value and
//! apply a null replacement.
//!
//! Decoding never returns partial results: any failure is reported as the
//! same [`ErrorKind::InvalidCursor`](crate::error::ErrorKind::InvalidCursor).

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value as Json;
use tracing::debug;

use crate::error::AppError;
use crate::result::AppResult;
use crate::types::value::{SqlValue, ValueType};

/// Encode already-rendered JSON slots.
pub fn encode(values: &[Json]) -> String {
    STANDARD.encode(Json::Array(values.to_vec()).to_string())
}

/// Encode typed key values, writing zero values as `null`.
pub fn encode_values(values: &[SqlValue]) -> String {
    let slots: Vec<Json> = values
        .iter()
        .map(|v| if v.is_zero() { Json::Null } else { v.to_json() })
        .collect();
    encode(&slots)
}

/// Decode `token` into one value per entry of `types`.
pub fn decode(token: &str, types: &[ValueType]) -> AppResult<Vec<SqlValue>> {
    let bytes = STANDARD.decode(token).map_err(|e| reject("base64", &e))?;
    let json: Json = serde_json::from_slice(&bytes).map_err(|e| reject("json", &e))?;
    let Json::Array(slots) = json else {
        return Err(reject("shape", &"not an array"));
    };
    if slots.len() != types.len() {
        return Err(reject("length", &slots.len()));
    }

    slots
        .iter()
        .zip(types)
        .map(|(slot, ty)| SqlValue::from_json(*ty, slot).ok_or_else(|| reject("type", ty)))
        .collect()
}

fn reject(stage: &str, reason: &dyn std::fmt::Debug) -> AppError {
    debug!(stage, reason = ?reason, "Rejected cursor token");
    AppError::invalid_cursor()
}
