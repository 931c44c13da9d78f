use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{display_text, is_falsy, present, Owner};

/// A rental unit.
///
/// Every field is kept as raw JSON: the UI has written numbers, numeric
/// strings, nulls and nested objects into these fields over time, and one
/// odd record must not make the whole collection unreadable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Apartment {
  #[serde(rename = "nom", default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
  pub name: Option<Value>,
  /// Name of the owning [`Owner`]
  #[serde(rename = "proprietaireNom", default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
  pub owner_name: Option<Value>,
  #[serde(rename = "cout", default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
  pub cost: Option<Value>,
  #[serde(rename = "locataire", default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
  pub tenant: Option<Value>,
  #[serde(rename = "dateEntree", default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
  pub entry_date: Option<Value>,
  #[serde(rename = "dateIntegration", default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
  pub integration_date: Option<Value>,
  /// Pre-2.0 single date field, superseded by `entry_date`/`integration_date`
  #[serde(rename = "date", default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
  pub legacy_date: Option<Value>,
  #[serde(rename = "ville", default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
  pub city: Option<Value>,
  #[serde(rename = "quartier", default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
  pub district: Option<Value>,
  #[serde(rename = "avance", default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
  pub advance: Option<Value>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

impl Apartment {
  pub fn new(name: impl Into<String>, owner_name: impl Into<String>) -> Self {
    Self {
      name: Some(Value::String(name.into())),
      owner_name: Some(Value::String(owner_name.into())),
      ..Self::default()
    }
  }

  /// Name as shown in reports.
  pub fn label(&self) -> String {
    display_text(&self.name)
  }

  /// The owner reference, when one is set (empty and null values count as
  /// unset).
  pub fn owner(&self) -> Option<&Value> {
    self.owner_name.as_ref().filter(|o| !is_falsy(o))
  }

  /// Whether this apartment's owner is one of `owners`.
  /// An apartment without an owner never matches.
  pub fn owned_by(&self, owners: &[Owner]) -> bool {
    match self.owner() {
      Some(owner) => owners.iter().any(|o| o.name.as_ref() == Some(owner)),
      None => false,
    }
  }
}
