//! Legacy record migration.

use serde_json::Value;
use tracing::warn;

use crate::config::IntegrityConfig;
use crate::models::{display_text, is_falsy, Apartment, Owner};

/// Result of one migration pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationOutcome {
  /// Number of fields whose stored value changed
  pub modifications: usize,
  /// Owner names referenced by apartments but absent from the owner list,
  /// one entry per referencing apartment
  pub unknown_owners: Vec<String>,
}

/// Upgrade apartments in place to the current record shape.
///
/// Only real changes are counted, so a second pass over the output reports
/// zero modifications.
pub fn migrate_apartments(
  apartments: &mut [Apartment],
  owners: &[Owner],
  config: &IntegrityConfig,
) -> MigrationOutcome {
  let mut outcome = MigrationOutcome::default();
  let default_advance = Value::from(config.default_advance);

  for apt in apartments.iter_mut() {
    if let Some(date) = apt.legacy_date.clone().filter(|d| !is_falsy(d)) {
      if is_unset(&apt.entry_date) && replace(&mut apt.entry_date, date.clone()) {
        outcome.modifications += 1;
      }
      if is_unset(&apt.integration_date) && replace(&mut apt.integration_date, date) {
        outcome.modifications += 1;
      }
    }

    let label = Value::String(config.unspecified_label.clone());
    if is_blank(&apt.city) && replace(&mut apt.city, label.clone()) {
      outcome.modifications += 1;
    }
    if is_blank(&apt.district) && replace(&mut apt.district, label) {
      outcome.modifications += 1;
    }

    // Absent and explicit zero both take the default
    if is_unset(&apt.advance) && replace(&mut apt.advance, default_advance.clone()) {
      outcome.modifications += 1;
    }

    if let Some(owner) = apt.owner() {
      if !apt.owned_by(owners) {
        let owner = display_text(&Some(owner.clone()));
        warn!(apartment = %apt.label(), owner = %owner, "Owner not found in owner list");
        outcome.unknown_owners.push(owner);
      }
    }
  }

  outcome
}

fn is_unset(field: &Option<Value>) -> bool {
  field.as_ref().map_or(true, is_falsy)
}

/// Unset, or a string holding only whitespace.
fn is_blank(field: &Option<Value>) -> bool {
  match field {
    Some(Value::String(s)) => s.trim().is_empty(),
    other => is_unset(other),
  }
}

/// Store `value` in `field`, returning whether the stored value changed.
fn replace<T: PartialEq>(field: &mut Option<T>, value: T) -> bool {
  if field.as_ref() == Some(&value) {
    return false;
  }
  *field = Some(value);
  true
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn apartment(value: Value) -> Apartment {
    serde_json::from_value(value).unwrap()
  }

  #[test]
  fn test_legacy_date_fills_structured_dates() {
    let mut apts = vec![apartment(json!({
      "nom": "A1", "proprietaireNom": "X", "date": "2024-01-01",
      "ville": "Cotonou", "quartier": "Akpakpa", "avance": 150000
    }))];

    let outcome = migrate_apartments(&mut apts, &[Owner::new("X")], &IntegrityConfig::default());

    assert_eq!(outcome.modifications, 2);
    assert_eq!(apts[0].entry_date, Some(json!("2024-01-01")));
    assert_eq!(apts[0].integration_date, Some(json!("2024-01-01")));
    assert_eq!(apts[0].legacy_date, Some(json!("2024-01-01")));
    assert!(outcome.unknown_owners.is_empty());
  }

  #[test]
  fn test_existing_structured_dates_are_kept() {
    let mut apts = vec![apartment(json!({
      "nom": "A1", "proprietaireNom": "X", "date": "2024-01-01",
      "dateEntree": "2023-06-01", "dateIntegration": "",
      "ville": "Cotonou", "quartier": "Akpakpa", "avance": 1
    }))];

    let outcome = migrate_apartments(&mut apts, &[Owner::new("X")], &IntegrityConfig::default());

    assert_eq!(outcome.modifications, 1);
    assert_eq!(apts[0].entry_date, Some(json!("2023-06-01")));
    assert_eq!(apts[0].integration_date, Some(json!("2024-01-01")));
  }

  #[test]
  fn test_blank_location_gets_label() {
    let mut apts = vec![apartment(json!({
      "nom": "A1", "proprietaireNom": "X", "ville": "   ", "avance": 5
    }))];

    let outcome = migrate_apartments(&mut apts, &[Owner::new("X")], &IntegrityConfig::default());

    assert_eq!(outcome.modifications, 2);
    assert_eq!(apts[0].city, Some(json!("Non spécifié")));
    assert_eq!(apts[0].district, Some(json!("Non spécifié")));
  }

  #[test]
  fn test_advance_absent_and_zero_are_conflated() {
    let config = IntegrityConfig {
      default_advance: 25000,
      ..IntegrityConfig::default()
    };
    let mut apts = vec![
      apartment(json!({"nom": "A1", "ville": "V", "quartier": "Q"})),
      apartment(json!({"nom": "A2", "ville": "V", "quartier": "Q", "avance": 0})),
      apartment(json!({"nom": "A3", "ville": "V", "quartier": "Q", "avance": 10})),
    ];

    let outcome = migrate_apartments(&mut apts, &[], &config);

    assert_eq!(outcome.modifications, 2);
    assert_eq!(apts[0].advance, Some(json!(25000)));
    assert_eq!(apts[1].advance, Some(json!(25000)));
    assert_eq!(apts[2].advance, Some(json!(10)));
  }

  #[test]
  fn test_explicit_zero_with_zero_default_is_not_a_change() {
    let mut apts = vec![apartment(json!({
      "nom": "A1", "ville": "V", "quartier": "Q", "avance": 0
    }))];

    let outcome = migrate_apartments(&mut apts, &[], &IntegrityConfig::default());
    assert_eq!(outcome.modifications, 0);
  }

  #[test]
  fn test_migration_is_idempotent() {
    let mut apts = vec![
      apartment(json!({"nom": "A1", "proprietaireNom": "X", "date": "2024-01-01"})),
      apartment(json!({"nom": "A2", "proprietaireNom": "Y", "ville": "", "avance": ""})),
    ];
    let owners = [Owner::new("X")];
    let config = IntegrityConfig::default();

    let first = migrate_apartments(&mut apts, &owners, &config);
    let snapshot = apts.clone();
    let second = migrate_apartments(&mut apts, &owners, &config);

    assert!(first.modifications > 0);
    assert_eq!(second.modifications, 0);
    assert_eq!(apts, snapshot);
  }

  #[test]
  fn test_non_string_fields_are_handled() {
    let mut apts = vec![apartment(json!({
      "nom": "A1", "proprietaireNom": "X", "date": 20240101,
      "ville": 229, "quartier": null, "avance": "50000",
      "locataire": {"nom": "Koffi"}
    }))];

    let outcome = migrate_apartments(&mut apts, &[Owner::new("X")], &IntegrityConfig::default());

    // Both dates copied, quartier labelled, ville kept as written
    assert_eq!(outcome.modifications, 3);
    assert_eq!(apts[0].entry_date, Some(json!(20240101)));
    assert_eq!(apts[0].city, Some(json!(229)));
    assert_eq!(apts[0].district, Some(json!("Non spécifié")));
    assert_eq!(apts[0].tenant, Some(json!({"nom": "Koffi"})));
  }

  #[test]
  fn test_unknown_owner_is_reported_not_fatal() {
    let mut apts = vec![
      Apartment::new("A1", "X"),
      Apartment::new("A2", "Ghost"),
      Apartment::default(),
    ];

    let outcome = migrate_apartments(&mut apts, &[Owner::new("X")], &IntegrityConfig::default());
    assert_eq!(outcome.unknown_owners, vec!["Ghost".to_string()]);
  }
}
