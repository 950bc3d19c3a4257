//! Schema collaborator interface: field and relation descriptors plus the
//! normalization contract the store depends on.

mod field;
mod relation;

pub use field::{FieldConstraint, FieldSchema};
pub use relation::RelationSchema;

use std::fmt;

use serde_json::Value;

use crate::error::DbError;
use crate::snapshot::{NormalizedState, Record, RecordId};

/// Normalization-aware description of one table.
///
/// The schema definition language lives outside this crate; the store only
/// depends on the narrow contract below. `normalize` must produce valid
/// partial snapshots (unique ids, `ids` matching `by_id` keys) for every
/// table the payload touches, including tables reached through embedded
/// relations, and must preserve input order in each `ids` list.
pub trait TableSchema: fmt::Debug + Send + Sync {
    /// Table name.
    fn name(&self) -> &str;

    /// Field descriptors in declaration order.
    fn fields(&self) -> &[FieldSchema];

    /// Reverse-relation descriptors declared against this table.
    fn relations(&self) -> &[RelationSchema];

    /// Normalizes an arbitrary-shape payload into per-table partial
    /// snapshots.
    fn normalize(&self, data: &Value) -> Result<NormalizedState, DbError>;

    /// Extracts the primary key of a payload record, in string form.
    fn primary_key_of(&self, data: &Value) -> Result<RecordId, DbError>;

    /// Reports whether `new` carries changes relative to `old`.
    fn is_modified(&self, old: &Record, new: &Record) -> bool;
}

/// Finds the primary-key field among `fields`, if one is declared.
pub fn primary_key_field(fields: &[FieldSchema]) -> Option<&FieldSchema> {
    fields
        .iter()
        .find(|f| f.constraint == FieldConstraint::PrimaryKey)
}
