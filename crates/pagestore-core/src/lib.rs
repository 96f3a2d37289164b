//! # pagestore-core
//!
//! Core crate for Pagestore. Contains the error system, configuration
//! schemas, typed SQL values, filter/sort/pagination types, schema
//! descriptors, the [`Record`] trait, and the cursor codec.
//!
//! This crate does not talk to a database.

pub mod config;
pub mod cursor;
pub mod error;
pub mod result;
pub mod schema;
pub mod traits;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
pub use schema::{Field, Schema};
pub use traits::Record;
