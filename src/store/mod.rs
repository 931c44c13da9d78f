//! Persistent key-value store for the SmartLoc collections.
//!
//! Every domain collection (apartments, owners, accounting config, ...) is kept
//! as one JSON blob under a well-known key and rewritten whole on mutation.
//! Reads favor availability: a missing or unparseable blob resolves to the
//! caller's default instead of an error.

mod keys;
mod memory;
mod sqlite;
mod traits;

pub use keys::StoreKey;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{LocalStore, LocalStoreExt};
