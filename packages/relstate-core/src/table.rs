//! Table state management: one table's current snapshot and its transitions.
//!
//! A [`Table`] holds its current [`TableSnapshot`] behind an `ArcSwap`:
//! readers load a consistent snapshot without locking, writers build a new
//! snapshot value and atomically publish it. Snapshots are never mutated
//! after publication, so a reader holding the previous snapshot is
//! unaffected by later writes.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::error::DbError;
use crate::schema::TableSchema;
use crate::snapshot::{merge_records, Record, TableSnapshot};

/// One table's live state within a session.
#[derive(Debug)]
pub struct Table {
    /// Table name (matches the schema's name)
    name: String,
    /// Schema collaborator describing fields, relations, and normalization
    schema: Arc<dyn TableSchema>,
    /// Current snapshot, atomically swapped on every write
    state: ArcSwap<TableSnapshot>,
}

impl Table {
    pub(crate) fn new(schema: Arc<dyn TableSchema>, initial: Arc<TableSnapshot>) -> Self {
        Self {
            name: schema.name().to_string(),
            schema,
            state: ArcSwap::new(initial),
        }
    }

    /// Table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Schema collaborator for this table.
    pub fn schema(&self) -> &Arc<dyn TableSchema> {
        &self.schema
    }

    /// Loads the current snapshot.
    pub fn snapshot(&self) -> Arc<TableSnapshot> {
        self.state.load_full()
    }

    /// True iff a record with `id` is present in the current snapshot.
    pub fn exists(&self, id: &str) -> bool {
        self.state.load().contains(id)
    }

    pub(crate) fn record(&self, id: &str) -> Option<Arc<Record>> {
        self.state.load().record(id).map(Arc::clone)
    }

    /// Publishes the current snapshot with `portion`'s records merged in.
    ///
    /// New ids are appended in the portion's order; an id already present
    /// keeps its position and has its record replaced.
    pub(crate) fn apply_insert(&self, portion: &TableSnapshot) {
        if portion.is_empty() {
            return;
        }
        let next = self.state.load().with_inserted(portion);
        tracing::debug!(
            table = %self.name,
            records = portion.len(),
            "insert published new snapshot"
        );
        self.state.store(Arc::new(next));
    }

    /// Applies a normalized update portion.
    ///
    /// Every id in the portion must already exist; the check runs before
    /// any record is replaced, so a failing update leaves the snapshot
    /// untouched. A record the schema reports as unmodified keeps its
    /// object identity, and a portion that modifies nothing leaves the
    /// snapshot object itself in place.
    pub(crate) fn apply_update(&self, portion: &TableSnapshot) -> Result<(), DbError> {
        let current = self.state.load_full();
        for id in &portion.ids {
            if !current.contains(id) {
                return Err(DbError::RecordNotFound {
                    table: self.name.clone(),
                    id: id.clone(),
                });
            }
        }

        let mut by_id = current.by_id.clone();
        let mut modified = 0usize;
        for id in &portion.ids {
            let Some(new_record) = portion.record(id) else {
                continue;
            };
            let old_record = &current.by_id[id];
            if self.schema.is_modified(old_record, new_record) {
                by_id.insert(id.clone(), Arc::new(merge_records(old_record, new_record)));
                modified += 1;
            }
        }

        if modified > 0 {
            tracing::debug!(
                table = %self.name,
                records = modified,
                "update published new snapshot"
            );
            self.state
                .store(Arc::new(TableSnapshot::from_parts(current.ids.clone(), by_id)));
        }
        Ok(())
    }

    /// Insert-or-merge for already-normalized propagated portions.
    ///
    /// Existing ids take the update path (merge only when modified), new
    /// ids are appended. Used by session fan-out, where the portion may mix
    /// both kinds.
    pub(crate) fn apply_upsert(&self, portion: &TableSnapshot) {
        let current = self.state.load_full();
        let mut ids = current.ids.clone();
        let mut by_id = current.by_id.clone();
        let mut touched = 0usize;

        for id in &portion.ids {
            let Some(new_record) = portion.record(id) else {
                continue;
            };
            match current.record(id) {
                Some(old_record) => {
                    if self.schema.is_modified(old_record, new_record) {
                        by_id.insert(id.clone(), Arc::new(merge_records(old_record, new_record)));
                        touched += 1;
                    }
                }
                None => {
                    ids.push(id.clone());
                    by_id.insert(id.clone(), Arc::clone(new_record));
                    touched += 1;
                }
            }
        }

        if touched > 0 {
            tracing::debug!(
                table = %self.name,
                records = touched,
                "upsert published new snapshot"
            );
            self.state
                .store(Arc::new(TableSnapshot::from_parts(ids, by_id)));
        }
    }

    /// Removes `id` if present. Returns whether a record was removed.
    pub(crate) fn remove(&self, id: &str) -> bool {
        match self.state.load().with_removed(id) {
            Some(next) => {
                tracing::debug!(table = %self.name, %id, "delete published new snapshot");
                self.state.store(Arc::new(next));
                true
            }
            None => false,
        }
    }
}
