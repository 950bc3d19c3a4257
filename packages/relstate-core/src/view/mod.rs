//! Record views: lazy, relationship-aware facades over live table state.

mod factory;
mod record;

pub use factory::{FieldAccessor, ViewFactory, ViewShape};
pub use record::{FieldValue, RecordField, RecordSetView, RecordView};

use serde_json::Value;

/// Renders a foreign-key value in the string form used for id comparison.
///
/// Nulls and structured values carry no id.
pub(crate) fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
