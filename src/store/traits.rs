//! Store traits: a raw string seam plus typed JSON access on top of it.

use color_eyre::{eyre::eyre, Result};
use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

use super::keys::StoreKey;

/// Raw key-value backend.
///
/// Values are opaque strings; callers own serialization. There is no
/// transactionality: concurrent writers race and the last write wins.
pub trait LocalStore: Send + Sync {
  /// Get the raw value stored under `key`, if any.
  fn get_raw(&self, key: &str) -> Result<Option<String>>;

  /// Replace the value stored under `key`.
  fn set_raw(&self, key: &str, value: &str) -> Result<()>;

  /// Remove `key`. Returns whether a value was present.
  fn remove(&self, key: &str) -> Result<bool>;

  /// All keys currently present, sorted.
  fn keys(&self) -> Result<Vec<String>>;
}

/// Typed JSON access over any [`LocalStore`].
pub trait LocalStoreExt: LocalStore {
  /// Read and parse the blob under `key`, failing on unreadable entries.
  ///
  /// Missing entries resolve to `T::default()`. Use this before rewriting a
  /// collection, so a blob that could not be parsed is never overwritten.
  fn try_read<T: DeserializeOwned + Default>(&self, key: StoreKey) -> Result<T> {
    match self.get_raw(key.as_str())? {
      Some(raw) => {
        serde_json::from_str(&raw).map_err(|e| eyre!("Failed to parse {}: {}", key, e))
      }
      None => Ok(T::default()),
    }
  }

  /// Read and parse the blob under `key`.
  ///
  /// Missing entries resolve to `T::default()`. Corrupt entries and backend
  /// read failures also resolve to the default, with a warning.
  fn read<T: DeserializeOwned + Default>(&self, key: StoreKey) -> T {
    self.try_read(key).unwrap_or_else(|e| {
      warn!(key = %key, error = %e, "Unreadable store entry, using default");
      T::default()
    })
  }

  /// Serialize `value` and overwrite the blob under `key`.
  fn write<T: Serialize + ?Sized>(&self, key: StoreKey, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value)
      .map_err(|e| eyre!("Failed to serialize {}: {}", key, e))?;
    self.set_raw(key.as_str(), &raw)
  }
}

impl<S: LocalStore + ?Sized> LocalStoreExt for S {}
