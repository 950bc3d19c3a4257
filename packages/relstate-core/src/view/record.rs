//! Record, field, and record-set views.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::DbError;
use crate::schema::{primary_key_field, FieldSchema, RelationSchema};
use crate::session::{Session, TableRef};
use crate::snapshot::{Record, RecordId};
use crate::table::Table;

use super::factory::{FieldAccessor, ViewShape};
use super::id_string;

/// Live view over one record.
///
/// A view is a pure lookup handle: [`RecordView::value`] re-reads the owning
/// table's current snapshot on every call, so it is never stale relative to
/// that table. Views are cheap to create, hold no record data themselves,
/// and are recreated per read.
#[derive(Clone)]
pub struct RecordView<'a> {
    session: &'a Session,
    table: &'a Table,
    id: RecordId,
    shape: Arc<ViewShape>,
}

impl<'a> RecordView<'a> {
    pub(crate) fn new(
        session: &'a Session,
        table: &'a Table,
        id: RecordId,
        shape: Arc<ViewShape>,
    ) -> Self {
        Self {
            session,
            table,
            id,
            shape,
        }
    }

    /// Record id, in string form.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Owning table's name.
    pub fn table_name(&self) -> &str {
        self.table.name()
    }

    /// Current record data, or `None` if the record has since been deleted.
    pub fn value(&self) -> Option<Arc<Record>> {
        self.table.record(&self.id)
    }

    /// Current value of a field, read straight off the live record.
    pub fn scalar(&self, name: &str) -> Option<Value> {
        self.value().and_then(|record| record.get(name).cloned())
    }

    /// Resolves an accessor name against this record: a live scalar
    /// wrapper, the referenced record of a forward foreign key, or the
    /// record set of a reverse relation.
    pub fn field(&self, name: &str) -> Result<FieldValue<'a>, DbError> {
        match self.shape.accessor(name) {
            FieldAccessor::ForeignKey(field) => self.foreign_key(field).map(FieldValue::Record),
            FieldAccessor::Relation(relation) => self.relation(relation).map(FieldValue::Set),
            FieldAccessor::Scalar => Ok(FieldValue::Field(RecordField {
                record: self.clone(),
                name: name.to_string(),
            })),
        }
    }

    /// Writes through an accessor.
    ///
    /// Foreign-key and scalar fields delegate to [`RecordView::update`];
    /// reverse relations are read-only navigational views and fail with
    /// [`DbError::InvalidOperation`].
    pub fn set(&self, name: &str, value: Value) -> Result<(), DbError> {
        let field_name = match self.shape.accessor(name) {
            FieldAccessor::Relation(relation) => {
                return Err(DbError::InvalidOperation(format!(
                    "cannot assign through reverse relation '{}' on table '{}'",
                    relation.relation_name,
                    self.table.name()
                )));
            }
            FieldAccessor::ForeignKey(field) => field.name.clone(),
            FieldAccessor::Scalar => name.to_string(),
        };
        let mut fields = Map::new();
        fields.insert(field_name, value);
        self.update(fields)
    }

    /// Merges `fields` into this record through the owning table's update
    /// path. The record's primary key is filled in when the payload omits
    /// it, so the schema can address the record.
    pub fn update(&self, fields: Map<String, Value>) -> Result<(), DbError> {
        let mut payload = fields;
        if let Some(pk) = primary_key_field(self.table.schema().fields()) {
            payload
                .entry(pk.name.clone())
                .or_insert_with(|| Value::String(self.id.clone()));
        }
        TableRef::new(self.session, self.table).update(&Value::Object(payload))?;
        Ok(())
    }

    /// Deletes this record from its table.
    pub fn delete(&self) -> bool {
        TableRef::new(self.session, self.table).delete(&self.id)
    }

    fn foreign_key(&self, field: &FieldSchema) -> Result<Option<RecordView<'a>>, DbError> {
        let target = field.references.as_deref().unwrap_or_default();
        let table = self
            .session
            .table(target)
            .map_err(|_| DbError::UnregisteredTable {
                field: field.name.clone(),
                table: target.to_string(),
            })?;
        let Some(record) = self.value() else {
            return Ok(None);
        };
        let Some(ref_id) = record.get(&field.name).and_then(id_string) else {
            return Ok(None);
        };
        Ok(table.get_or_default(&ref_id))
    }

    fn relation(&self, relation: &RelationSchema) -> Result<RecordSetView<'a>, DbError> {
        let table = self
            .session
            .table(&relation.table)
            .map_err(|_| DbError::UnregisteredTable {
                field: relation.name.clone(),
                table: relation.table.clone(),
            })?;
        // Linear scan; membership is string-compared ids.
        let records = table.filter(|view| {
            view.scalar(&relation.name)
                .as_ref()
                .and_then(id_string)
                .is_some_and(|ref_id| ref_id == self.id)
        });
        Ok(RecordSetView {
            records,
            table: relation.table.clone(),
            referenced_from: RecordField {
                record: self.clone(),
                name: relation.relation_name.clone(),
            },
        })
    }
}

/// Live wrapper over one scalar field of a record.
#[derive(Clone)]
pub struct RecordField<'a> {
    record: RecordView<'a>,
    name: String,
}

impl<'a> RecordField<'a> {
    /// Field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current field value, re-read from the live snapshot.
    pub fn value(&self) -> Option<Value> {
        self.record.scalar(&self.name)
    }

    /// The record this field belongs to.
    pub fn record(&self) -> &RecordView<'a> {
        &self.record
    }
}

/// Reverse side of a one-to-many relation: every record in the referencing
/// table whose foreign key points at the originating record.
///
/// Navigational and read-only; inserting or updating through a relation is
/// unsupported.
pub struct RecordSetView<'a> {
    records: Vec<RecordView<'a>>,
    table: String,
    referenced_from: RecordField<'a>,
}

impl<'a> RecordSetView<'a> {
    /// Referencing table's name.
    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// The accessor this set was reached through.
    pub fn referenced_from(&self) -> &RecordField<'a> {
        &self.referenced_from
    }

    /// Member views, in the referencing table's order.
    pub fn records(&self) -> &[RecordView<'a>] {
        &self.records
    }

    /// Member ids, in the referencing table's order.
    pub fn ids(&self) -> Vec<&str> {
        self.records.iter().map(|record| record.id()).collect()
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True iff no record references the originating one.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterates the member views.
    pub fn iter(&self) -> std::slice::Iter<'_, RecordView<'a>> {
        self.records.iter()
    }
}

impl<'a> IntoIterator for RecordSetView<'a> {
    type Item = RecordView<'a>;
    type IntoIter = std::vec::IntoIter<RecordView<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

/// Result of resolving one accessor on a record view.
pub enum FieldValue<'a> {
    /// Plain scalar field
    Field(RecordField<'a>),
    /// Forward foreign key: the referenced record, when present
    Record(Option<RecordView<'a>>),
    /// Reverse-relation record set
    Set(RecordSetView<'a>),
}

impl<'a> FieldValue<'a> {
    /// Scalar value, when this resolved to a plain field.
    pub fn as_scalar(&self) -> Option<Value> {
        match self {
            FieldValue::Field(field) => field.value(),
            _ => None,
        }
    }

    /// Referenced record view, when this resolved to a present foreign key.
    pub fn as_record(&self) -> Option<&RecordView<'a>> {
        match self {
            FieldValue::Record(record) => record.as_ref(),
            _ => None,
        }
    }

    /// Record set, when this resolved to a reverse relation.
    pub fn as_set(&self) -> Option<&RecordSetView<'a>> {
        match self {
            FieldValue::Set(set) => Some(set),
            _ => None,
        }
    }
}
