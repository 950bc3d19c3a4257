//! Normalized in-memory relational state store.
//!
//! Holds denormalized domain data as normalized tables (ordered id lists
//! plus id-to-record maps) behind immutable snapshots, and exposes lazy,
//! relationship-aware record views over a session's live state.
//!
//! A [`Session`] checks out one [`TopState`], materializes a [`Table`] per
//! registered schema, and fans normalized multi-table writes out to every
//! affected table. [`Session::commit`] folds the changed snapshots back into
//! a new top-level state with structural sharing, so unchanged tables keep
//! their prior snapshot object and callers can detect change by reference
//! equality.

pub mod error;
pub mod schema;
pub mod session;
pub mod snapshot;
pub mod table;
pub mod view;

pub use error::DbError;
pub use schema::{FieldConstraint, FieldSchema, RelationSchema, TableSchema};
pub use session::{Session, TableRef};
pub use snapshot::{NormalizedState, Record, RecordId, TableSnapshot, TopState};
pub use table::Table;
pub use view::{FieldValue, RecordField, RecordSetView, RecordView, ViewFactory};
