//! Unified error types for Pagestore.
//!
//! Every crate maps its internal errors into [`AppError`] so that callers see
//! one taxonomy regardless of which layer failed. Driver-specific errors are
//! only ever kept as a type-erased `source`.

use std::fmt;
use thiserror::Error;

/// Error kind categorization used across the entire workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// Zero rows where exactly one (or at least one affected) row was required.
    NotFound,
    /// A unique constraint was violated.
    Duplicated,
    /// Any other database or driver failure.
    Database,
    /// A continuation token could not be decoded.
    InvalidCursor,
    /// A pagination key or column does not exist on the record schema.
    InvalidModel,
    /// A filter rule refers to an unknown column or is malformed.
    InvalidRule,
    /// A filter condition carries a bad literal or a disallowed operation.
    Validation,
    /// Pagination was requested without any pagination rule.
    NoRule,
    /// The requested limit is not usable.
    InvalidLimit,
    /// The requested sort order is not `asc` or `desc`.
    InvalidOrder,
    /// A transaction was committed or rolled back without being begun.
    Transaction,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// An internal error occurred.
    Internal,
}

impl ErrorKind {
    /// HTTP status class a caller should report for this kind.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidCursor | Self::Validation | Self::InvalidLimit | Self::InvalidOrder => 400,
            Self::NotFound => 404,
            Self::Duplicated => 409,
            _ => 500,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Duplicated => write!(f, "DUPLICATED"),
            Self::Database => write!(f, "DATABASE"),
            Self::InvalidCursor => write!(f, "INVALID_CURSOR"),
            Self::InvalidModel => write!(f, "INVALID_MODEL"),
            Self::InvalidRule => write!(f, "INVALID_RULE"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::NoRule => write!(f, "NO_RULE"),
            Self::InvalidLimit => write!(f, "INVALID_LIMIT"),
            Self::InvalidOrder => write!(f, "INVALID_ORDER"),
            Self::Transaction => write!(f, "TRANSACTION"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified error used throughout Pagestore.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Individual problems when several were collected at once.
    pub details: Vec<String>,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: Vec::new(),
            source: None,
        }
    }

    /// Create a new error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            details: Vec::new(),
            source: Some(Box::new(source)),
        }
    }

    /// Attach a list of individual problems.
    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    /// Create an invalid-cursor error. The message is always the same so that
    /// no detail about the token's contents leaks back to clients.
    pub fn invalid_cursor() -> Self {
        Self::new(ErrorKind::InvalidCursor, "invalid cursor")
    }

    /// Create an invalid-model error.
    pub fn invalid_model(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidModel, message)
    }

    /// Create an invalid-rule error.
    pub fn invalid_rule(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRule, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a no-rule error.
    pub fn no_rule() -> Self {
        Self::new(ErrorKind::NoRule, "at least one pagination rule is required")
    }

    /// Create an invalid-limit error.
    pub fn invalid_limit(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidLimit, message)
    }

    /// Create an invalid-order error.
    pub fn invalid_order(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidOrder, message)
    }

    /// Create a transaction error.
    pub fn transaction(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transaction, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Prefix the message with `context`, keeping the kind.
    pub fn context(mut self, context: impl fmt::Display) -> Self {
        self.message = format!("{context}: {}", self.message);
        self
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            details: self.details.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
