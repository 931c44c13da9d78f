use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Commission settings for one apartment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommissionConfig {
  #[serde(rename = "pourcentage", default, skip_serializing_if = "Option::is_none")]
  pub percentage: Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub date: Option<Value>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

/// Commission configuration keyed by apartment position in the apartment
/// collection (not by a stable id). A `null` entry counts as missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountingConfig(pub BTreeMap<String, Option<CommissionConfig>>);

impl AccountingConfig {
  pub fn has_entry(&self, index: usize) -> bool {
    matches!(self.0.get(&index.to_string()), Some(Some(_)))
  }

  pub fn insert(&mut self, index: usize, config: CommissionConfig) {
    self.0.insert(index.to_string(), Some(config));
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_has_entry() {
    let config: AccountingConfig = serde_json::from_value(json!({
      "0": { "pourcentage": 10, "date": "2024-01-01" },
      "2": null
    }))
    .unwrap();

    assert!(config.has_entry(0));
    assert!(!config.has_entry(1));
    assert!(!config.has_entry(2));
  }
}
