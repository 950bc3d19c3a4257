//! Reverse-relation descriptor between tables.

use serde::{Deserialize, Serialize};

/// Reverse side of a foreign key: the one-to-many link from a referenced
/// table back to the records that reference it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationSchema {
    /// Foreign-key field name on the referencing table
    pub name: String,
    /// Accessor name exposed on the referenced table's record views
    pub relation_name: String,
    /// Name of the referencing table
    pub table: String,
}
