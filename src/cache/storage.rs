//! Named response caches.

use color_eyre::{eyre::eyre, Result};
use std::collections::HashMap;
use std::sync::Mutex;

use super::types::{Request, Response};

/// Storage holding any number of named caches, each mapping request keys to
/// responses.
///
/// Every single put or delete is atomic. `put_all` commits a batch into one
/// cache atomically; there are no transactions spanning caches.
pub trait CacheStorage: Send + Sync {
  /// Create the cache if it does not exist yet.
  fn open(&self, cache_name: &str) -> Result<()>;

  /// Cache names in creation order.
  fn keys(&self) -> Result<Vec<String>>;

  /// Delete a cache and all its entries. Returns whether it existed.
  fn delete(&self, cache_name: &str) -> Result<bool>;

  /// Store a response, creating the cache if needed.
  fn put(&self, cache_name: &str, request: &Request, response: &Response) -> Result<()>;

  /// Store several responses at once; either all are committed or none.
  fn put_all(&self, cache_name: &str, entries: &[(Request, Response)]) -> Result<()>;

  /// Look a request up in one cache.
  fn match_in(&self, cache_name: &str, request: &Request) -> Result<Option<Response>>;

  /// Look a request up across all caches, oldest cache first.
  fn match_any(&self, request: &Request) -> Result<Option<Response>>;

  /// Number of entries in a cache (0 when it does not exist).
  fn entry_count(&self, cache_name: &str) -> Result<usize>;

  /// Cache version recorded by the last completed activation.
  fn active_version(&self) -> Result<Option<String>>;

  /// Record `version` as activated.
  fn set_active_version(&self, version: &str) -> Result<()>;
}

#[derive(Debug, Default)]
struct NamedCache {
  name: String,
  entries: HashMap<String, Response>,
}

/// In-memory cache storage.
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
  caches: Mutex<Vec<NamedCache>>,
  active_version: Mutex<Option<String>>,
}

impl MemoryCacheStorage {
  pub fn new() -> Self {
    Self::default()
  }

  fn with_caches<T>(&self, f: impl FnOnce(&mut Vec<NamedCache>) -> T) -> Result<T> {
    let mut caches = self
      .caches
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(f(&mut caches))
  }
}

fn open_in<'a>(caches: &'a mut Vec<NamedCache>, cache_name: &str) -> &'a mut NamedCache {
  match caches.iter().position(|c| c.name == cache_name) {
    Some(index) => &mut caches[index],
    None => {
      caches.push(NamedCache {
        name: cache_name.to_string(),
        entries: HashMap::new(),
      });
      let last = caches.len() - 1;
      &mut caches[last]
    }
  }
}

impl CacheStorage for MemoryCacheStorage {
  fn open(&self, cache_name: &str) -> Result<()> {
    self.with_caches(|caches| {
      open_in(caches, cache_name);
    })
  }

  fn keys(&self) -> Result<Vec<String>> {
    self.with_caches(|caches| caches.iter().map(|c| c.name.clone()).collect())
  }

  fn delete(&self, cache_name: &str) -> Result<bool> {
    self.with_caches(|caches| {
      let before = caches.len();
      caches.retain(|c| c.name != cache_name);
      caches.len() != before
    })
  }

  fn put(&self, cache_name: &str, request: &Request, response: &Response) -> Result<()> {
    self.with_caches(|caches| {
      open_in(caches, cache_name)
        .entries
        .insert(request.cache_key(), response.clone());
    })
  }

  fn put_all(&self, cache_name: &str, entries: &[(Request, Response)]) -> Result<()> {
    self.with_caches(|caches| {
      let cache = open_in(caches, cache_name);
      for (request, response) in entries {
        cache.entries.insert(request.cache_key(), response.clone());
      }
    })
  }

  fn match_in(&self, cache_name: &str, request: &Request) -> Result<Option<Response>> {
    let key = request.cache_key();
    self.with_caches(|caches| {
      caches
        .iter()
        .find(|c| c.name == cache_name)
        .and_then(|c| c.entries.get(&key).cloned())
    })
  }

  fn match_any(&self, request: &Request) -> Result<Option<Response>> {
    let key = request.cache_key();
    self.with_caches(|caches| caches.iter().find_map(|c| c.entries.get(&key).cloned()))
  }

  fn entry_count(&self, cache_name: &str) -> Result<usize> {
    self.with_caches(|caches| {
      caches
        .iter()
        .find(|c| c.name == cache_name)
        .map_or(0, |c| c.entries.len())
    })
  }

  fn active_version(&self) -> Result<Option<String>> {
    let active = self
      .active_version
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(active.clone())
  }

  fn set_active_version(&self, version: &str) -> Result<()> {
    *self
      .active_version
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))? = Some(version.to_string());
    Ok(())
  }
}
