//! Immutable table snapshots and the committed top-level state.
//!
//! All mutation in the store happens by building a new snapshot value and
//! atomically swapping a reference; a snapshot is never touched after it has
//! been published. Records are held behind `Arc` so an unchanged record
//! keeps its object identity across snapshots, and `Arc::ptr_eq` is the
//! change-detection primitive at both the record and the table level.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};

/// Record identifier, always held in string form.
pub type RecordId = String;

/// A single record: field name to scalar or foreign-key-id value.
pub type Record = Map<String, Value>;

/// Normalized multi-table write: table name to partial snapshot.
pub type NormalizedState = HashMap<String, TableSnapshot>;

/// Immutable snapshot of one table: ordered id list plus id-to-record map.
///
/// Invariant: `ids` holds exactly the keys of `by_id`, without duplicates,
/// in insertion order.
#[derive(Debug, Clone, Default)]
pub struct TableSnapshot {
    /// Record ids in insertion order
    pub ids: Vec<RecordId>,
    /// Records keyed by id
    pub by_id: HashMap<RecordId, Arc<Record>>,
}

impl TableSnapshot {
    /// Creates an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a snapshot from an id list and record map.
    pub fn from_parts(ids: Vec<RecordId>, by_id: HashMap<RecordId, Arc<Record>>) -> Self {
        Self { ids, by_id }
    }

    /// True iff a record with `id` is present.
    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Looks up the record stored under `id`.
    pub fn record(&self, id: &str) -> Option<&Arc<Record>> {
        self.by_id.get(id)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// True iff the snapshot holds no records.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// New snapshot with `incoming`'s records merged in.
    ///
    /// New ids are appended in the incoming order; an id already present
    /// keeps its list position and has its record replaced wholesale. The
    /// `ids` list stays duplicate-free either way.
    pub fn with_inserted(&self, incoming: &TableSnapshot) -> Self {
        let mut ids = self.ids.clone();
        let mut by_id = self.by_id.clone();
        for id in &incoming.ids {
            let Some(record) = incoming.by_id.get(id) else {
                continue;
            };
            if !by_id.contains_key(id) {
                ids.push(id.clone());
            }
            by_id.insert(id.clone(), Arc::clone(record));
        }
        Self { ids, by_id }
    }

    /// New snapshot without `id`, or `None` when it was absent.
    pub fn with_removed(&self, id: &str) -> Option<Self> {
        if !self.by_id.contains_key(id) {
            return None;
        }
        let mut by_id = self.by_id.clone();
        by_id.remove(id);
        let ids = self.ids.iter().filter(|i| *i != id).cloned().collect();
        Some(Self { ids, by_id })
    }
}

/// Committed top-level state: table name to published snapshot.
///
/// Replaced wholesale on commit with one level of structural sharing: a
/// table that received no write keeps its prior snapshot `Arc`.
#[derive(Debug, Clone, Default)]
pub struct TopState {
    /// Published snapshots keyed by table name
    pub tables: HashMap<String, Arc<TableSnapshot>>,
}

impl TopState {
    /// Creates an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up the published snapshot for `name`.
    pub fn table(&self, name: &str) -> Option<&Arc<TableSnapshot>> {
        self.tables.get(name)
    }
}

/// Shallow merge: `old`'s fields overridden by `new`'s.
pub(crate) fn merge_records(old: &Record, new: &Record) -> Record {
    let mut merged = old.clone();
    for (key, value) in new {
        merged.insert(key.clone(), value.clone());
    }
    merged
}
