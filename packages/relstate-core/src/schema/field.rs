//! Field descriptor within a table schema.

use serde::{Deserialize, Serialize};

/// Constraint kind attached to a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldConstraint {
    /// Plain scalar field
    None,
    /// Primary key of the declaring table
    PrimaryKey,
    /// Foreign key into another table
    ForeignKey,
}

/// Field descriptor within a table schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSchema {
    /// Field name as stored on the record
    pub name: String,
    /// Accessor name exposed on record views
    pub prop_name: String,
    /// Constraint kind
    pub constraint: FieldConstraint,
    /// Name of the declaring table
    pub table: String,
    /// Referenced table name, for foreign keys
    pub references: Option<String>,
}

impl FieldSchema {
    /// True if this field is a foreign key with a declared target table.
    pub fn is_foreign_key(&self) -> bool {
        self.constraint == FieldConstraint::ForeignKey && self.references.is_some()
    }
}
