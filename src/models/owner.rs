use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{display_text, present, Apartment};

/// A property owner. `name` identifies the owner within the collection;
/// uniqueness is assumed, not enforced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Owner {
  #[serde(rename = "nom", default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
  pub name: Option<Value>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

impl Owner {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: Some(Value::String(name.into())),
      extra: Map::new(),
    }
  }

  pub fn label(&self) -> String {
    display_text(&self.name)
  }

  /// Apartments owned by this owner, found by scanning `apartments`.
  pub fn apartments<'a>(&'a self, apartments: &'a [Apartment]) -> impl Iterator<Item = &'a Apartment> + 'a {
    apartments
      .iter()
      .filter(move |a| a.owned_by(std::slice::from_ref(self)))
  }
}
