//! Store error types.

use thiserror::Error;

/// Errors raised by the relational state store.
///
/// `delete` of a missing id and `get_or_default` misses are deliberately not
/// errors: the API distinguishes "caller asked for something that must
/// exist" (fails) from "caller is probing" (returns `None` or no-ops).
#[derive(Error, Debug, Clone)]
pub enum DbError {
    /// Table not registered with the session
    #[error("Table '{table}' not found")]
    TableNotFound { table: String },

    /// Record not present in the table it was addressed through
    #[error("No '{table}' record with id '{id}' exists")]
    RecordNotFound { table: String, id: String },

    /// Foreign key or relation pointing at a table absent from the session
    #[error("Field '{field}' references an unregistered table: '{table}'")]
    UnregisteredTable { field: String, table: String },

    /// Write attempted through a read-only accessor
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Schema collaborator rejected a payload
    #[error("Failed to normalize payload for table '{table}': {reason}")]
    Normalization { table: String, reason: String },
}
