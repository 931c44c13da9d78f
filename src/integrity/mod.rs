//! Data integrity engine.
//!
//! Runs over whole collections loaded from the [`LocalStore`]:
//! - `migrate_legacy_records` upgrades old apartment shapes in place
//! - `synchronize_owners` drops apartments whose owner no longer exists
//! - `verify_integrity` audits cross-collection references
//!
//! `initialize` runs all three in that order and is meant to be called once
//! per session start.

mod migrate;
mod synchronize;
mod verify;

pub use migrate::{migrate_apartments, MigrationOutcome};
pub use synchronize::{partition, Partition, SyncReport};
pub use verify::{check, Problem, ProblemKind};

use chrono::{DateTime, Utc};
use color_eyre::Result;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::IntegrityConfig;
use crate::models::{AccountingConfig, Apartment, Owner};
use crate::store::{LocalStore, LocalStoreExt, StoreKey};

/// Summary of a full initialization pass.
#[derive(Debug, Clone, Serialize)]
pub struct InitReport {
  /// Field-level modifications made by migration
  pub migrated: usize,
  pub sync: SyncReport,
  pub problems: Vec<Problem>,
  pub timestamp: DateTime<Utc>,
}

pub struct IntegrityEngine<S: LocalStore> {
  store: Arc<S>,
  config: IntegrityConfig,
}

impl<S: LocalStore> IntegrityEngine<S> {
  pub fn new(store: Arc<S>, config: IntegrityConfig) -> Self {
    Self { store, config }
  }

  pub fn store(&self) -> &Arc<S> {
    &self.store
  }

  /// Load a collection that is about to be rewritten. `None` when the
  /// stored blob exists but cannot be read.
  fn load_for_rewrite<T: DeserializeOwned + Default>(&self, key: StoreKey) -> Option<T> {
    match self.store.try_read(key) {
      Ok(value) => Some(value),
      Err(e) => {
        warn!(key = %key, error = %e, "Collection unreadable, leaving it untouched");
        None
      }
    }
  }

  /// Migrate legacy apartment records and return the number of modified
  /// fields. The collection is only written back when something changed.
  pub fn migrate_legacy_records(&self) -> Result<usize> {
    let Some(mut apartments) = self.load_for_rewrite::<Vec<Apartment>>(StoreKey::Apartments) else {
      return Ok(0);
    };
    let owners: Vec<Owner> = self.store.read(StoreKey::Owners);

    let outcome = migrate_apartments(&mut apartments, &owners, &self.config);

    if outcome.modifications > 0 {
      self.store.write(StoreKey::Apartments, &apartments)?;
      info!(modifications = outcome.modifications, "Applied legacy record migration");
    }

    Ok(outcome.modifications)
  }

  /// Keep only apartments whose owner exists.
  ///
  /// Orphaned apartments are removed from the persisted collection; the
  /// report names them so callers can surface the loss. When either
  /// collection cannot be read nothing is written and the report is marked
  /// `skipped`.
  pub fn synchronize_owners(&self) -> Result<SyncReport> {
    let apartments = self.load_for_rewrite::<Vec<Apartment>>(StoreKey::Apartments);
    let owners = self.load_for_rewrite::<Vec<Owner>>(StoreKey::Owners);
    let (Some(apartments), Some(owners)) = (apartments, owners) else {
      return Ok(SyncReport {
        skipped: true,
        ..SyncReport::default()
      });
    };

    let parts = partition(apartments, &owners);
    let report = parts.report();

    if report.orphaned > 0 {
      warn!(orphans = %report.orphan_names.join(", "), "Dropping orphaned apartments");
    }

    self.store.write(StoreKey::Apartments, &parts.valid)?;

    Ok(report)
  }

  /// Audit the stored collections. Never fails: unreadable collections are
  /// treated as empty.
  pub fn verify_integrity(&self) -> Vec<Problem> {
    let apartments: Vec<Apartment> = self.store.read(StoreKey::Apartments);
    let owners: Vec<Owner> = self.store.read(StoreKey::Owners);
    let accounting: AccountingConfig = self.store.read(StoreKey::AccountingConfig);

    check(&apartments, &owners, &accounting)
  }

  /// Migrate, then synchronize, then verify.
  pub fn initialize(&self) -> Result<InitReport> {
    info!("Initializing SmartLoc data");

    let migrated = self.migrate_legacy_records()?;
    let sync = self.synchronize_owners()?;
    let problems = self.verify_integrity();

    Ok(InitReport {
      migrated,
      sync,
      problems,
      timestamp: Utc::now(),
    })
  }
}
