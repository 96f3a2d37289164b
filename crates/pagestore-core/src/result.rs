//! Convenience result type alias for Pagestore.

use crate::error::AppError;

/// A specialized `Result` type for Pagestore operations.
pub type AppResult<T> = Result<T, AppError>;
