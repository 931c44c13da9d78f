//! Owner/apartment reconciliation.

use serde::Serialize;

use crate::models::{Apartment, Owner};

/// Counts reported by a synchronization pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
  pub total: usize,
  pub valid: usize,
  pub orphaned: usize,
  /// Names of the dropped apartments
  pub orphan_names: Vec<String>,
  /// The stored collections could not be parsed and were left untouched
  pub skipped: bool,
}

/// Apartments split by whether their owner exists.
#[derive(Debug, Clone, Default)]
pub struct Partition {
  pub valid: Vec<Apartment>,
  pub orphans: Vec<Apartment>,
}

impl Partition {
  pub fn report(&self) -> SyncReport {
    SyncReport {
      total: self.valid.len() + self.orphans.len(),
      valid: self.valid.len(),
      orphaned: self.orphans.len(),
      orphan_names: self.orphans.iter().map(Apartment::label).collect(),
      skipped: false,
    }
  }
}

/// Split `apartments` into those whose owner name matches an owner and the
/// orphans. Order within each side is preserved.
pub fn partition(apartments: Vec<Apartment>, owners: &[Owner]) -> Partition {
  let (valid, orphans): (Vec<Apartment>, Vec<Apartment>) = apartments
    .into_iter()
    .partition(|apt| apt.owned_by(owners));

  Partition { valid, orphans }
}
