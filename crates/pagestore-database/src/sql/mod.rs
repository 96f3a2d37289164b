//! Parameterized SQL construction.
//!
//! Identifiers (tables, columns, sort expressions) come from store
//! configuration and are written verbatim. Every value goes through a `$n`
//! placeholder.

pub mod predicate;
pub mod select;
pub mod statement;
pub mod write;

pub use predicate::{CompareOp, Operand, Predicate};
pub use select::{OrderTerm, Select};
pub use statement::{SqlWriter, Statement};
pub use write::{Delete, Insert, Update};
