//! View factory: per-table view shapes and record view construction.
//!
//! A view shape is pure derived data describing which accessor names on a
//! table's views resolve relationally. Shapes are built lazily, once per
//! table name, and cached for the factory's lifetime; the factory is meant
//! to be created at the application root, wrapped in an `Arc`, and handed to
//! every session.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::schema::{FieldSchema, RelationSchema, TableSchema};
use crate::session::Session;
use crate::snapshot::RecordId;
use crate::table::Table;

use super::record::RecordView;

static SCALAR: FieldAccessor = FieldAccessor::Scalar;

/// How one accessor name on a record view resolves.
#[derive(Debug, Clone)]
pub enum FieldAccessor {
    /// Forward foreign key into another table
    ForeignKey(FieldSchema),
    /// Reverse one-to-many relation from another table
    Relation(RelationSchema),
    /// Plain scalar field
    Scalar,
}

/// Schema-derived dispatch table for one table's views.
///
/// Never mutated after its first build.
#[derive(Debug, Default)]
pub struct ViewShape {
    accessors: HashMap<String, FieldAccessor>,
}

impl ViewShape {
    fn build(schema: &dyn TableSchema) -> Self {
        let mut accessors = HashMap::new();
        for field in schema.fields() {
            if field.is_foreign_key() {
                accessors.insert(
                    field.prop_name.clone(),
                    FieldAccessor::ForeignKey(field.clone()),
                );
            }
        }
        for relation in schema.relations() {
            accessors.insert(
                relation.relation_name.clone(),
                FieldAccessor::Relation(relation.clone()),
            );
        }
        Self { accessors }
    }

    /// Resolution kind for `name`; any undeclared name is a scalar.
    pub fn accessor(&self, name: &str) -> &FieldAccessor {
        self.accessors.get(name).unwrap_or(&SCALAR)
    }
}

/// Builds record views and memoizes per-table view shapes.
///
/// Safe to share across sessions and threads: the lazy shape build is
/// double-checked under the cache lock.
#[derive(Debug, Default)]
pub struct ViewFactory {
    shapes: RwLock<HashMap<String, Arc<ViewShape>>>,
}

impl ViewFactory {
    /// Creates a factory with an empty shape cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached shape for `schema`, building it on first use.
    pub fn shape_for(&self, schema: &dyn TableSchema) -> Arc<ViewShape> {
        if let Some(shape) = self.shapes.read().unwrap().get(schema.name()) {
            return Arc::clone(shape);
        }
        let mut shapes = self.shapes.write().unwrap();
        // Re-check under the write lock: another session may have built it.
        if let Some(shape) = shapes.get(schema.name()) {
            return Arc::clone(shape);
        }
        tracing::trace!(table = schema.name(), "building view shape");
        let shape = Arc::new(ViewShape::build(schema));
        shapes.insert(schema.name().to_string(), Arc::clone(&shape));
        shape
    }

    /// Creates a view over `id` in `table`.
    pub fn record_view<'a>(
        &self,
        session: &'a Session,
        table: &'a Table,
        id: RecordId,
    ) -> RecordView<'a> {
        let shape = self.shape_for(table.schema().as_ref());
        RecordView::new(session, table, id, shape)
    }
}
