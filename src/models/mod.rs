//! Domain records persisted in the local store.
//!
//! Field names on the wire are the ones the SmartLoc UI writes (French,
//! camelCase); fields this crate does not know about are carried through
//! `extra` so a read-modify-write never loses data.

mod accounting;
mod apartment;
mod owner;

pub use accounting::{AccountingConfig, CommissionConfig};
pub use apartment::Apartment;
pub use owner::Owner;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Deserialize a present field as `Some`, explicit `null` included, so it is
/// written back exactly as read. Absent fields fall back to `default`.
pub(crate) fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
  Value::deserialize(deserializer).map(Some)
}

/// Display form of a free-form field for reports: strings as they are,
/// other values as JSON, absent fields as an empty string.
pub fn display_text(value: &Option<Value>) -> String {
  match value {
    None => String::new(),
    Some(Value::String(s)) => s.clone(),
    Some(other) => other.to_string(),
  }
}

/// Loose truthiness test for values written by the UI: `null`, `false`, `0`,
/// `NaN` and `""` are falsy.
pub fn is_falsy(value: &Value) -> bool {
  match value {
    Value::Null => true,
    Value::Bool(b) => !b,
    Value::Number(n) => n.as_f64().map_or(false, |f| f == 0.0 || f.is_nan()),
    Value::String(s) => s.is_empty(),
    Value::Array(_) | Value::Object(_) => false,
  }
}
