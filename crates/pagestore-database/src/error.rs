//! Translation of sqlx errors into [`AppError`].

use pagestore_core::error::{AppError, ErrorKind};

/// Map a driver error into the store taxonomy.
///
/// Unique violations become [`ErrorKind::Duplicated`] and a missing row
/// becomes [`ErrorKind::NotFound`]; everything else is
/// [`ErrorKind::Database`].
pub fn map_sqlx_error(err: sqlx::Error, context: &str) -> AppError {
    let duplicate = match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            Some(db.constraint().unwrap_or("unique constraint").to_string())
        }
        _ => None,
    };

    if let Some(constraint) = duplicate {
        return AppError::with_source(
            ErrorKind::Duplicated,
            format!("{context}: duplicate value violates '{constraint}'"),
            err,
        );
    }

    match err {
        sqlx::Error::RowNotFound => AppError::not_found(format!("{context}: no rows returned")),
        other => AppError::with_source(ErrorKind::Database, format!("{context}: {other}"), other),
    }
}
