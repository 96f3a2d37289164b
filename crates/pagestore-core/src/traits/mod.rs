//! Core traits implemented by entity types.

pub mod record;

pub use record::Record;
