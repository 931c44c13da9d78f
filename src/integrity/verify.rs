//! Referential integrity audit.

use serde::Serialize;

use crate::models::{AccountingConfig, Apartment, Owner};

/// Category of an integrity problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProblemKind {
  /// Apartment references an owner that does not exist
  #[serde(rename = "proprietaire")]
  UnknownOwner,
  /// Apartment has no commission configuration
  #[serde(rename = "compta")]
  MissingAccounting,
  /// Owner has no apartment
  #[serde(rename = "proprietaire_vide")]
  OwnerWithoutApartment,
}

/// One failed check, with the names of the offending records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Problem {
  #[serde(rename = "type")]
  pub kind: ProblemKind,
  pub message: String,
  pub details: Vec<String>,
}

/// Run every check and concatenate their findings in check order.
/// Checks that find nothing contribute no entry.
pub fn check(apartments: &[Apartment], owners: &[Owner], accounting: &AccountingConfig) -> Vec<Problem> {
  let mut problems = Vec::new();

  let unknown_owner: Vec<String> = apartments
    .iter()
    .filter(|a| !a.owned_by(owners))
    .map(Apartment::label)
    .collect();
  if !unknown_owner.is_empty() {
    problems.push(Problem {
      kind: ProblemKind::UnknownOwner,
      message: format!("{} apartment(s) with unknown owner", unknown_owner.len()),
      details: unknown_owner,
    });
  }

  let unconfigured: Vec<String> = apartments
    .iter()
    .enumerate()
    .filter(|(index, _)| !accounting.has_entry(*index))
    .map(|(_, a)| a.label())
    .collect();
  if !unconfigured.is_empty() {
    problems.push(Problem {
      kind: ProblemKind::MissingAccounting,
      message: format!(
        "{} apartment(s) not configured for commissions",
        unconfigured.len()
      ),
      details: unconfigured,
    });
  }

  let empty_owners: Vec<String> = owners
    .iter()
    .filter(|o| o.apartments(apartments).next().is_none())
    .map(Owner::label)
    .collect();
  if !empty_owners.is_empty() {
    problems.push(Problem {
      kind: ProblemKind::OwnerWithoutApartment,
      message: format!("{} owner(s) without an assigned apartment", empty_owners.len()),
      details: empty_owners,
    });
  }

  problems
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::CommissionConfig;

  fn configured(count: usize) -> AccountingConfig {
    let mut config = AccountingConfig::default();
    for index in 0..count {
      config.insert(index, CommissionConfig::default());
    }
    config
  }

  #[test]
  fn test_consistent_dataset_has_no_problems() {
    let apartments = vec![Apartment::new("A1", "X"), Apartment::new("A2", "Y")];
    let owners = [Owner::new("X"), Owner::new("Y")];

    assert!(check(&apartments, &owners, &configured(2)).is_empty());
  }

  #[test]
  fn test_empty_dataset_has_no_problems() {
    assert!(check(&[], &[], &AccountingConfig::default()).is_empty());
  }

  #[test]
  fn test_all_checks_run_in_order() {
    let apartments = vec![Apartment::new("A1", "X"), Apartment::new("A2", "Ghost")];
    let owners = [Owner::new("X"), Owner::new("Lonely")];

    let problems = check(&apartments, &owners, &configured(1));

    let kinds: Vec<_> = problems.iter().map(|p| p.kind).collect();
    assert_eq!(
      kinds,
      vec![
        ProblemKind::UnknownOwner,
        ProblemKind::MissingAccounting,
        ProblemKind::OwnerWithoutApartment,
      ]
    );
    assert_eq!(problems[0].details, vec!["A2"]);
    assert_eq!(problems[0].message, "1 apartment(s) with unknown owner");
    assert_eq!(problems[1].details, vec!["A2"]);
    assert_eq!(problems[2].details, vec!["Lonely"]);
  }

  #[test]
  fn test_only_failing_checks_produce_entries() {
    let apartments = vec![Apartment::new("A1", "X")];
    let problems = check(&apartments, &[Owner::new("X")], &AccountingConfig::default());

    assert_eq!(problems.len(), 1);
    assert_eq!(problems[0].kind, ProblemKind::MissingAccounting);
  }

  #[test]
  fn test_problem_wire_shape() {
    let problems = check(&[Apartment::new("A1", "Ghost")], &[], &configured(1));
    let json = serde_json::to_value(&problems).unwrap();

    assert_eq!(
      json,
      serde_json::json!([{
        "type": "proprietaire",
        "message": "1 apartment(s) with unknown owner",
        "details": ["A1"]
      }])
    );
  }
}
