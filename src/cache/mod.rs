//! Offline cache manager.
//!
//! Keeps two named caches:
//! - the versioned asset cache, filled at install from the asset manifest and
//!   replaced wholesale when the version changes
//! - the offline-data cache, holding JSON blobs saved through the message
//!   channel, which survives version changes
//!
//! Intercepted requests are served cache-first (manifest assets) or
//! network-first (everything else). API paths and data files are never
//! intercepted.

mod clients;
mod manager;
mod manifest;
mod messages;
mod network;
mod sqlite;
mod storage;
mod strategy;
mod types;
mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use clients::{ClientId, ClientRegistry};
pub use manager::{
  ActivationReport, CacheManager, CacheStatus, FetchOutcome, LifecycleState, LoggingSync,
  SyncHandler,
};
pub use manifest::{AssetManifest, RequestRouter, Strategy};
pub use messages::{Reply, WorkerMessage};
pub use network::{HttpNetwork, Network, NetworkError};
pub use sqlite::SqliteCacheStorage;
pub use storage::{CacheStorage, MemoryCacheStorage};
pub use strategy::{CacheSource, Served};
pub use types::{Method, Request, RequestMode, Response};
pub use worker::{spawn, OfflineDataClient, ReplyPort, WorkerEvent, WorkerHandle};
