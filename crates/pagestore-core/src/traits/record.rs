//! The record trait every stored entity implements.

use std::fmt::Debug;

use chrono::{DateTime, Utc};

use crate::schema::Schema;
use crate::types::value::SqlValue;

/// An entity with a store-assigned identifier and creation/update timestamps.
///
/// The store never inspects struct fields directly: it reads column values
/// through [`Record::value`] using the names declared in [`Record::schema`].
pub trait Record: Send + Sync + 'static {
    /// Identifier type.
    type Id: Clone + Debug + Send + Sync + Into<SqlValue> + 'static;

    /// Static description of the backing table.
    fn schema() -> &'static Schema;

    /// Current identifier.
    fn id(&self) -> Self::Id;

    /// Write back an identifier assigned by the store.
    fn set_id(&mut self, id: Self::Id);

    /// Value of the field with logical name `field`, or `None` if the record
    /// has no such field.
    fn value(&self, field: &str) -> Option<SqlValue>;

    /// Creation timestamp.
    fn created_at(&self) -> DateTime<Utc>;

    /// Set the creation timestamp.
    fn set_created_at(&mut self, at: DateTime<Utc>);

    /// Set the update timestamp.
    fn set_updated_at(&mut self, at: DateTime<Utc>);
}
