//! Session: one checkout of the top-level state.
//!
//! A session materializes one [`Table`] per registered schema at
//! construction and never recreates them. Per-table CRUD goes through
//! [`TableRef`], a borrow-guard handle that carries the owning session so a
//! write can fan its embedded related records out to their own tables.
//! [`Session::commit`] folds the changed snapshots back into a new
//! [`TopState`] with structural sharing.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde_json::Value;

use crate::error::DbError;
use crate::schema::TableSchema;
use crate::snapshot::{NormalizedState, TableSnapshot, TopState};
use crate::table::Table;
use crate::view::{RecordView, ViewFactory};

/// One synchronous mutation cycle over a [`TopState`].
///
/// Single-writer by design: all mutation builds new immutable snapshot
/// values and swaps a reference, so reads through live views stay cheap and
/// consistent. Callers create a fresh session per mutation cycle and discard
/// it after [`Session::commit`].
#[derive(Debug)]
pub struct Session {
    /// State the session was checked out from; replaced on commit
    pub(crate) state: ArcSwap<TopState>,
    /// One table per registered schema, constructed once
    pub(crate) tables: HashMap<String, Table>,
    /// Shared view factory with the per-table shape cache
    pub(crate) views: Arc<ViewFactory>,
}

impl Session {
    /// Creates a session over `initial` with one table per schema.
    ///
    /// # Arguments
    /// * `initial` - Top-level state being checked out
    /// * `schemas` - One schema per table the session should know about
    /// * `views` - Shared view factory (one per application root)
    ///
    /// Tables absent from `initial` start from an empty snapshot.
    pub fn new(
        initial: TopState,
        schemas: Vec<Arc<dyn TableSchema>>,
        views: Arc<ViewFactory>,
    ) -> Self {
        let mut tables = HashMap::with_capacity(schemas.len());
        for schema in schemas {
            let snapshot = initial
                .table(schema.name())
                .cloned()
                .unwrap_or_else(|| Arc::new(TableSnapshot::new()));
            tables.insert(schema.name().to_string(), Table::new(schema, snapshot));
        }
        Self {
            state: ArcSwap::new(Arc::new(initial)),
            tables,
            views,
        }
    }

    /// Looks up a table by name.
    pub fn table(&self, name: &str) -> Result<TableRef<'_>, DbError> {
        self.tables
            .get(name)
            .map(|table| TableRef {
                session: self,
                table,
            })
            .ok_or_else(|| DbError::TableNotFound {
                table: name.to_string(),
            })
    }

    /// Names of the registered tables.
    pub fn table_names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    /// Fans a normalized multi-table payload out to every named table
    /// except `from`, the table that originated the write.
    ///
    /// Skipping the originating table prevents propagation loops between
    /// tightly coupled tables.
    pub(crate) fn apply(
        &self,
        norm: &NormalizedState,
        from: Option<&str>,
    ) -> Result<(), DbError> {
        for (name, portion) in norm {
            if Some(name.as_str()) == from {
                continue;
            }
            let table = self
                .tables
                .get(name)
                .ok_or_else(|| DbError::TableNotFound { table: name.clone() })?;
            table.apply_upsert(portion);
        }
        Ok(())
    }

    /// Folds the tables' current snapshots into a new top-level state.
    ///
    /// Only tables whose snapshot object changed are replaced in a freshly
    /// copied map; an untouched table keeps its prior snapshot `Arc`, so
    /// the owning application can detect change by reference equality. A
    /// commit with no changed table returns the prior state unchanged.
    pub fn commit(&self) -> Arc<TopState> {
        let prev = self.state.load_full();
        let mut changed: Vec<(&str, Arc<TableSnapshot>)> = Vec::new();
        for (name, table) in &self.tables {
            let current = table.snapshot();
            let unchanged = prev
                .table(name)
                .is_some_and(|published| Arc::ptr_eq(published, &current));
            if !unchanged {
                changed.push((name.as_str(), current));
            }
        }

        if changed.is_empty() {
            return prev;
        }

        let mut tables = prev.tables.clone();
        for (name, snapshot) in &changed {
            tables.insert(name.to_string(), Arc::clone(snapshot));
        }
        tracing::debug!(tables = changed.len(), "session committed");
        let next = Arc::new(TopState { tables });
        self.state.store(Arc::clone(&next));
        next
    }
}

/// Borrow-guard handle over one table within its session.
#[derive(Debug, Clone, Copy)]
pub struct TableRef<'a> {
    pub(crate) session: &'a Session,
    pub(crate) table: &'a Table,
}

impl<'a> TableRef<'a> {
    pub(crate) fn new(session: &'a Session, table: &'a Table) -> Self {
        Self { session, table }
    }

    /// Table name.
    pub fn name(&self) -> &str {
        self.table.name()
    }

    /// Current snapshot of the underlying table.
    pub fn snapshot(&self) -> Arc<TableSnapshot> {
        self.table.snapshot()
    }

    /// True iff a record with `id` is present.
    pub fn exists(&self, id: &str) -> bool {
        self.table.exists(id)
    }

    /// View over the record with `id`; fails when it does not exist.
    pub fn get(&self, id: &str) -> Result<RecordView<'a>, DbError> {
        if !self.table.exists(id) {
            return Err(DbError::RecordNotFound {
                table: self.table.name().to_string(),
                id: id.to_string(),
            });
        }
        Ok(self.view(id))
    }

    /// Like [`TableRef::get`], but a miss is `None` instead of an error.
    pub fn get_or_default(&self, id: &str) -> Option<RecordView<'a>> {
        self.table.exists(id).then(|| self.view(id))
    }

    /// Views over every record, in table order.
    pub fn all(&self) -> Vec<RecordView<'a>> {
        let snapshot = self.table.snapshot();
        snapshot.ids.iter().map(|id| self.view(id)).collect()
    }

    /// Views over the records satisfying `predicate`, in table order.
    ///
    /// The predicate receives live views, so it observes the table's
    /// current snapshot.
    pub fn filter(&self, mut predicate: impl FnMut(&RecordView<'a>) -> bool) -> Vec<RecordView<'a>> {
        self.all()
            .into_iter()
            .filter(|view| predicate(view))
            .collect()
    }

    /// Inserts one record, along with any embedded related records.
    pub fn insert(&self, data: &Value) -> Result<RecordView<'a>, DbError> {
        self.insert_many(data)?
            .into_iter()
            .next()
            .ok_or_else(|| self.empty_payload())
    }

    /// Inserts the records a payload normalizes to.
    ///
    /// The payload's portions for other tables are propagated through the
    /// session; the returned views cover exactly this table's portion, in
    /// normalized order.
    ///
    /// # Arguments
    /// * `data` - Arbitrary-shape payload the schema can normalize
    ///
    /// # Returns
    /// `Result<Vec<RecordView>, DbError>` with one view per id this table's
    /// portion produced.
    pub fn insert_many(&self, data: &Value) -> Result<Vec<RecordView<'a>>, DbError> {
        let norm = self.table.schema().normalize(data)?;
        if let Some(portion) = norm.get(self.table.name()) {
            self.table.apply_insert(portion);
        }
        self.session.apply(&norm, Some(self.table.name()))?;
        Ok(self.portion_views(&norm))
    }

    /// Updates one existing record.
    pub fn update(&self, data: &Value) -> Result<RecordView<'a>, DbError> {
        self.update_many(data)?
            .into_iter()
            .next()
            .ok_or_else(|| self.empty_payload())
    }

    /// Updates the existing records a payload normalizes to.
    ///
    /// Every id in this table's portion must already exist; the check runs
    /// before any mutation, so a failing call leaves no table changed.
    ///
    /// # Returns
    /// Views for all ids in the portion, in normalized order, whether or
    /// not they were actually modified.
    pub fn update_many(&self, data: &Value) -> Result<Vec<RecordView<'a>>, DbError> {
        let norm = self.table.schema().normalize(data)?;
        if let Some(portion) = norm.get(self.table.name()) {
            self.table.apply_update(portion)?;
        }
        self.session.apply(&norm, Some(self.table.name()))?;
        Ok(self.portion_views(&norm))
    }

    /// Updates when the payload's primary key already exists, inserts
    /// otherwise.
    pub fn upsert(&self, data: &Value) -> Result<RecordView<'a>, DbError> {
        let pk = self.table.schema().primary_key_of(data)?;
        if self.table.exists(&pk) {
            self.update(data)
        } else {
            self.insert(data)
        }
    }

    /// Removes `id`, returning whether a record was removed.
    ///
    /// A missing id is a silent no-op, never an error. No cross-table
    /// cascade: foreign keys elsewhere are left pointing at the removed id.
    pub fn delete(&self, id: &str) -> bool {
        self.table.remove(id)
    }

    /// Removes each id in turn, returning how many records were removed.
    pub fn delete_many<I, S>(&self, ids: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        ids.into_iter()
            .filter(|id| self.table.remove(id.as_ref()))
            .count()
    }

    fn view(&self, id: &str) -> RecordView<'a> {
        self.session
            .views
            .record_view(self.session, self.table, id.to_string())
    }

    fn portion_views(&self, norm: &NormalizedState) -> Vec<RecordView<'a>> {
        norm.get(self.table.name())
            .map(|portion| portion.ids.iter().map(|id| self.view(id)).collect())
            .unwrap_or_default()
    }

    fn empty_payload(&self) -> DbError {
        DbError::Normalization {
            table: self.table.name().to_string(),
            reason: "payload produced no records for this table".to_string(),
        }
    }
}
