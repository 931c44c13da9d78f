//! Wiring of the store, integrity engine, cache manager and worker task.

use color_eyre::Result;
use std::sync::Arc;
use tracing::info;

use crate::cache::{
  self, ActivationReport, CacheManager, CacheStorage, HttpNetwork, LifecycleState, Network,
  OfflineDataClient, SqliteCacheStorage, WorkerHandle,
};
use crate::config::Config;
use crate::integrity::{InitReport, IntegrityEngine};
use crate::store::{LocalStore, SqliteStore};

/// A wired SmartLoc instance.
pub struct SmartLoc<S: LocalStore, C: CacheStorage, N: Network> {
  integrity: IntegrityEngine<S>,
  cache: Arc<CacheManager<C, N>>,
  worker: WorkerHandle,
}

/// The on-disk setup: SQLite store and cache, HTTP network.
pub type DefaultSmartLoc = SmartLoc<SqliteStore, SqliteCacheStorage, HttpNetwork>;

impl<S, C, N> SmartLoc<S, C, N>
where
  S: LocalStore,
  C: CacheStorage + 'static,
  N: Network + 'static,
{
  /// Build every component and start the cache worker task.
  ///
  /// Must be called inside a tokio runtime.
  pub fn wire(config: &Config, store: Arc<S>, storage: Arc<C>, network: Arc<N>) -> Result<Self> {
    let integrity = IntegrityEngine::new(store, config.integrity.clone());
    let cache = Arc::new(CacheManager::new(config, storage, network)?);
    let worker = cache::spawn(Arc::clone(&cache));

    Ok(Self {
      integrity,
      cache,
      worker,
    })
  }

  pub fn integrity(&self) -> &IntegrityEngine<S> {
    &self.integrity
  }

  pub fn cache(&self) -> &Arc<CacheManager<C, N>> {
    &self.cache
  }

  pub fn worker(&self) -> &WorkerHandle {
    &self.worker
  }

  /// Run the once-per-session integrity pass.
  pub fn start_session(&self) -> Result<InitReport> {
    self.integrity.initialize()
  }

  /// Bring the cache manager to the activated state.
  ///
  /// A version activated by an earlier run is resumed as is, and one that
  /// was installed but never activated is not fetched again. Anything else is
  /// installed. The installed version then activates unless it has to wait.
  /// Returns whether the manager ended up active.
  pub async fn start_worker(&self) -> Result<bool> {
    match self.cache.resume()? {
      LifecycleState::Activated => return Ok(true),
      LifecycleState::Installed => {}
      _ => {
        self.worker.install().await?;
      }
    }

    if !self.cache.ready_to_activate()? {
      info!(version = %self.cache.version(), "Installed version is waiting");
      return Ok(false);
    }

    self.activate().await?;
    Ok(true)
  }

  /// Activate a waiting version now.
  pub async fn skip_waiting(&self) -> Result<ActivationReport> {
    if self.cache.resume()? == LifecycleState::Parsed {
      self.worker.install().await?;
    }
    self.worker.skip_waiting()?;
    self.activate().await
  }

  async fn activate(&self) -> Result<ActivationReport> {
    let report = self.worker.activate().await?;
    info!(
      deleted = report.deleted.len(),
      claimed = report.claimed,
      "Cache activated"
    );
    Ok(report)
  }

  /// Register a new application context and hand back its data client.
  pub fn connect_client(&self) -> Result<OfflineDataClient> {
    let id = self.cache.register_client()?;
    Ok(OfflineDataClient::new(
      id,
      Arc::clone(self.cache.clients()),
      self.worker.clone(),
    ))
  }
}

impl DefaultSmartLoc {
  /// Open the store and cache databases under the configured data directory.
  pub fn open(config: &Config) -> Result<Self> {
    let store = Arc::new(SqliteStore::open(&config.store_path()?)?);
    let storage = Arc::new(SqliteCacheStorage::open_at(&config.cache_path()?)?);
    let network = Arc::new(HttpNetwork::new()?);

    Self::wire(config, store, storage, network)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::testing::FakeNetwork;
  use crate::cache::{LifecycleState, MemoryCacheStorage, Response};
  use crate::models::{Apartment, Owner};
  use crate::store::{LocalStoreExt, MemoryStore, StoreKey};
  use serde_json::json;
  use url::Url;

  type TestSmartLoc = SmartLoc<MemoryStore, MemoryCacheStorage, FakeNetwork>;

  fn config() -> Config {
    let mut config = Config::default();
    config.origin = Url::parse("https://smartloc.test/").unwrap();
    config.cache.assets = vec!["./".to_string(), "./index.html".to_string()];
    config
  }

  fn network() -> FakeNetwork {
    FakeNetwork::new()
      .serve(Url::parse("https://smartloc.test/").unwrap(), Response::ok("<root>"))
      .serve(
        Url::parse("https://smartloc.test/index.html").unwrap(),
        Response::ok("<index>"),
      )
  }

  fn wired(storage: Arc<MemoryCacheStorage>, network: FakeNetwork) -> TestSmartLoc {
    SmartLoc::wire(
      &config(),
      Arc::new(MemoryStore::new()),
      storage,
      Arc::new(network),
    )
    .unwrap()
  }

  #[tokio::test]
  async fn test_session_start_runs_integrity() {
    let app = wired(Arc::new(MemoryCacheStorage::new()), network());
    let store = app.integrity().store();
    store.write(StoreKey::Owners, &vec![Owner::new("Kouassi")]).unwrap();
    store
      .write(
        StoreKey::Apartments,
        &vec![Apartment::new("A1", "Kouassi"), Apartment::new("B2", "Inconnu")],
      )
      .unwrap();

    let report = app.start_session().unwrap();

    assert_eq!(report.sync.total, 2);
    assert_eq!(report.sync.valid, 1);
    let remaining: Vec<Apartment> = store.read(StoreKey::Apartments);
    assert_eq!(remaining.len(), 1);
  }

  #[tokio::test]
  async fn test_start_worker_installs_and_activates() {
    let app = wired(Arc::new(MemoryCacheStorage::new()), network());

    assert!(app.start_worker().await.unwrap());
    assert_eq!(app.cache().state().unwrap(), LifecycleState::Activated);
  }

  #[tokio::test]
  async fn test_start_worker_resumes_offline() {
    let storage = Arc::new(MemoryCacheStorage::new());
    let first = wired(storage.clone(), network());
    first.start_worker().await.unwrap();

    let second = wired(storage, FakeNetwork::new().offline());

    assert!(second.start_worker().await.unwrap());
    assert_eq!(second.cache().state().unwrap(), LifecycleState::Activated);
  }

  #[tokio::test]
  async fn test_waiting_version_stays_waiting_after_restart() {
    let mut config = config();
    config.cache.skip_waiting = false;
    let storage = Arc::new(MemoryCacheStorage::new());
    storage.open("smartloc-v1").unwrap();

    let first: TestSmartLoc = SmartLoc::wire(
      &config,
      Arc::new(MemoryStore::new()),
      storage.clone(),
      Arc::new(network()),
    )
    .unwrap();
    assert!(!first.start_worker().await.unwrap());

    let offline = Arc::new(FakeNetwork::new().offline());
    let second: TestSmartLoc = SmartLoc::wire(
      &config,
      Arc::new(MemoryStore::new()),
      storage.clone(),
      offline.clone(),
    )
    .unwrap();

    assert!(!second.start_worker().await.unwrap());
    assert_eq!(second.cache().state().unwrap(), LifecycleState::Installed);
    assert_eq!(offline.calls(), 0);
    assert_eq!(storage.keys().unwrap(), vec!["smartloc-v1", "smartloc-v2"]);

    let report = second.skip_waiting().await.unwrap();
    assert_eq!(report.deleted, vec!["smartloc-v1"]);
    assert_eq!(second.cache().state().unwrap(), LifecycleState::Activated);
  }

  #[tokio::test]
  async fn test_connected_client_round_trip() {
    let app = wired(Arc::new(MemoryCacheStorage::new()), network());
    app.start_worker().await.unwrap();

    let client = app.connect_client().unwrap();
    assert!(client
      .save_for_offline("paiements", json!([{"montant": 50000}]))
      .await
      .unwrap());
    assert_eq!(
      client.get_offline_data("paiements").await.unwrap(),
      Some(json!([{"montant": 50000}]))
    );
  }
}
