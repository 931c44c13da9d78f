//! Application contexts that the cache worker may control.

use color_eyre::{eyre::eyre, Result};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

pub type ClientId = u64;

/// Registered clients and the cache version controlling each, if any.
#[derive(Debug, Default)]
pub struct ClientRegistry {
  next_id: AtomicU64,
  clients: Mutex<BTreeMap<ClientId, Option<String>>>,
}

impl ClientRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a client, optionally already controlled by `controller`.
  pub fn register(&self, controller: Option<String>) -> Result<ClientId> {
    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
    self
      .clients
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?
      .insert(id, controller);
    Ok(id)
  }

  pub fn unregister(&self, id: ClientId) -> Result<()> {
    self
      .clients
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?
      .remove(&id);
    Ok(())
  }

  /// The cache version controlling `id`.
  pub fn controller(&self, id: ClientId) -> Result<Option<String>> {
    let clients = self
      .clients
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(clients.get(&id).cloned().flatten())
  }

  /// Put every registered client under `version`. Returns how many clients
  /// were claimed.
  pub fn claim(&self, version: &str) -> Result<usize> {
    let mut clients = self
      .clients
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    for controller in clients.values_mut() {
      *controller = Some(version.to_string());
    }
    Ok(clients.len())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_claim_takes_over_every_client() {
    let registry = ClientRegistry::new();
    let a = registry.register(None).unwrap();
    let b = registry.register(Some("smartloc-v1".to_string())).unwrap();

    assert_eq!(registry.claim("smartloc-v2").unwrap(), 2);
    assert_eq!(registry.controller(a).unwrap().as_deref(), Some("smartloc-v2"));
    assert_eq!(registry.controller(b).unwrap().as_deref(), Some("smartloc-v2"));
  }

  #[test]
  fn test_unregister() {
    let registry = ClientRegistry::new();
    let a = registry.register(None).unwrap();
    registry.unregister(a).unwrap();

    assert_eq!(registry.claim("v").unwrap(), 0);
    assert_eq!(registry.controller(a).unwrap(), None);
  }
}
