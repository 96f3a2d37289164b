//! Explicit schema descriptors.
//!
//! Each record type supplies one static [`Schema`] naming its table, its
//! fields and their columns. Stores validate pagination and filter rules
//! against it once, when they are built.

use crate::error::AppError;
use crate::result::AppResult;
use crate::types::value::ValueType;

/// One persisted field of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Logical field name.
    pub name: &'static str,
    /// Backend column.
    pub column: &'static str,
    /// Declared value type.
    pub value_type: ValueType,
    /// Excluded from `UPDATE ... SET` and upsert updates.
    pub skip_update: bool,
}

impl Field {
    /// Declare a field.
    pub const fn new(name: &'static str, column: &'static str, value_type: ValueType) -> Self {
        Self {
            name,
            column,
            value_type,
            skip_update: false,
        }
    }

    /// Never overwrite this column after insert.
    pub const fn skip_update(mut self) -> Self {
        self.skip_update = true;
        self
    }
}

/// Table-level description of a record type.
#[derive(Debug)]
pub struct Schema {
    /// Backend table.
    pub table: &'static str,
    /// All persisted fields, identifier included.
    pub fields: &'static [Field],
    /// Field holding the store-assigned identifier.
    pub id: &'static str,
    /// Field holding the creation timestamp.
    pub created_at: &'static str,
    /// Field holding the last-update timestamp.
    pub updated_at: &'static str,
    /// Field holding the soft-delete marker, if the table soft-deletes.
    pub deleted_at: Option<&'static str>,
}

impl Schema {
    /// Look up a field by logical name.
    pub fn field(&self, name: &str) -> Option<&'static Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Look up a field by column.
    pub fn field_by_column(&self, column: &str) -> Option<&'static Field> {
        self.fields.iter().find(|f| f.column == column)
    }

    /// Column of the identifier.
    pub fn id_column(&self) -> &'static str {
        self.column_of(self.id)
    }

    /// Column of the update timestamp.
    pub fn updated_at_column(&self) -> &'static str {
        self.column_of(self.updated_at)
    }

    /// Column of the soft-delete marker.
    pub fn deleted_at_column(&self) -> Option<&'static str> {
        self.deleted_at.map(|name| self.column_of(name))
    }

    /// Fields written by `INSERT`: everything but the identifier.
    pub fn insert_fields(&self) -> impl Iterator<Item = &'static Field> + '_ {
        let id = self.id;
        self.fields.iter().filter(move |f| f.name != id)
    }

    /// Fields written by `UPDATE`: no identifier, creation time, soft-delete
    /// marker, or skip-marked field.
    pub fn update_fields(&self) -> impl Iterator<Item = &'static Field> + '_ {
        self.fields.iter().filter(move |f| {
            !f.skip_update
                && f.name != self.id
                && f.name != self.created_at
                && Some(f.name) != self.deleted_at
        })
    }

    /// Check that every special field names a declared field.
    pub fn validate(&self) -> AppResult<()> {
        let special = [Some(self.id), Some(self.created_at), Some(self.updated_at), self.deleted_at];
        for name in special.into_iter().flatten() {
            if self.field(name).is_none() {
                return Err(AppError::invalid_model(format!(
                    "table '{}' has no field '{name}'",
                    self.table
                )));
            }
        }
        Ok(())
    }

    fn column_of(&self, name: &str) -> &'static str {
        // validate() guarantees the special fields exist
        self.field(name).map(|f| f.column).unwrap_or("")
    }
}
