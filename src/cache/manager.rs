//! Cache lifecycle state machine and event handlers.

use color_eyre::{eyre::eyre, Result};
use futures::future::{try_join_all, BoxFuture};
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::{CacheConfig, Config};

use super::clients::{ClientId, ClientRegistry};
use super::manifest::{AssetManifest, RequestRouter, Strategy};
use super::messages::{offline_data_request, Reply, WorkerMessage};
use super::network::{Network, NetworkError};
use super::storage::CacheStorage;
use super::strategy::{cache_first, network_first, Served};
use super::types::{Request, Response};

/// Lifecycle of the cache manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
  /// Constructed, not installed
  Parsed,
  Installing,
  /// Assets precached; waiting to activate
  Installed,
  Activating,
  /// Controlling clients and intercepting fetches
  Activated,
  /// Install failed
  Redundant,
}

#[derive(Debug)]
struct Lifecycle {
  state: LifecycleState,
  skip_waiting: bool,
}

/// What happened during activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivationReport {
  /// Stale caches that were deleted
  pub deleted: Vec<String>,
  /// Clients taken over
  pub claimed: usize,
}

/// Result of intercepting one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
  /// Not handled; the caller goes to the network itself
  Passthrough,
  Respond(Served),
}

/// Snapshot for status displays.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatus {
  pub state: LifecycleState,
  pub version: String,
  /// Every cache with its entry count
  pub caches: Vec<(String, usize)>,
}

/// Hook run by the background sync event.
pub trait SyncHandler: Send + Sync {
  fn sync(&self) -> BoxFuture<'_, Result<()>>;
}

/// Default sync handler: only records that a sync was requested.
pub struct LoggingSync;

impl SyncHandler for LoggingSync {
  fn sync(&self) -> BoxFuture<'_, Result<()>> {
    Box::pin(async {
      info!("Background sync requested");
      Ok(())
    })
  }
}

/// Offline cache manager.
///
/// Owns the versioned asset cache and the offline-data cache and reacts to
/// the install / activate / fetch / message / sync events.
pub struct CacheManager<C: CacheStorage, N: Network> {
  config: CacheConfig,
  origin: Url,
  router: RequestRouter,
  navigation_fallback: Url,
  storage: Arc<C>,
  network: Arc<N>,
  clients: Arc<ClientRegistry>,
  sync_handler: Arc<dyn SyncHandler>,
  lifecycle: Mutex<Lifecycle>,
}

impl<C: CacheStorage, N: Network> CacheManager<C, N> {
  pub fn new(config: &Config, storage: Arc<C>, network: Arc<N>) -> Result<Self> {
    let manifest = AssetManifest::new(&config.origin, &config.cache.assets)?;
    let navigation_fallback = config
      .origin
      .join(&config.cache.navigation_fallback)
      .map_err(|e| eyre!("Invalid navigation fallback: {}", e))?;

    Ok(Self {
      config: config.cache.clone(),
      origin: config.origin.clone(),
      router: RequestRouter::new(manifest, config.cache.passthrough.clone()),
      navigation_fallback,
      storage,
      network,
      clients: Arc::new(ClientRegistry::new()),
      sync_handler: Arc::new(LoggingSync),
      lifecycle: Mutex::new(Lifecycle {
        state: LifecycleState::Parsed,
        skip_waiting: false,
      }),
    })
  }

  /// Replace the background sync handler.
  pub fn with_sync_handler(mut self, handler: Arc<dyn SyncHandler>) -> Self {
    self.sync_handler = handler;
    self
  }

  pub fn storage(&self) -> &Arc<C> {
    &self.storage
  }

  pub fn clients(&self) -> &Arc<ClientRegistry> {
    &self.clients
  }

  pub fn version(&self) -> &str {
    &self.config.version
  }

  fn lifecycle(&self) -> Result<std::sync::MutexGuard<'_, Lifecycle>> {
    self.lifecycle.lock().map_err(|e| eyre!("Lock poisoned: {}", e))
  }

  fn set_state(&self, state: LifecycleState) -> Result<()> {
    let mut lifecycle = self.lifecycle()?;
    debug!(from = ?lifecycle.state, to = ?state, "Lifecycle transition");
    lifecycle.state = state;
    Ok(())
  }

  pub fn state(&self) -> Result<LifecycleState> {
    Ok(self.lifecycle()?.state)
  }

  /// Allow an installed manager to activate without waiting.
  pub fn skip_waiting(&self) -> Result<()> {
    self.lifecycle()?.skip_waiting = true;
    Ok(())
  }

  /// Installed and cleared to activate.
  pub fn ready_to_activate(&self) -> Result<bool> {
    let lifecycle = self.lifecycle()?;
    Ok(lifecycle.state == LifecycleState::Installed && lifecycle.skip_waiting)
  }

  /// Register an application context. Contexts created while the manager
  /// is active start out controlled by it.
  pub fn register_client(&self) -> Result<ClientId> {
    let controller = match self.state()? {
      LifecycleState::Activated => Some(self.config.version.clone()),
      _ => None,
    };
    self.clients.register(controller)
  }

  /// Pick up where an earlier run left this version.
  ///
  /// A version whose activation completed is active again. A version that
  /// was installed but never activated goes back to waiting, cleared to
  /// activate only under the same skip-waiting rule as a fresh install.
  /// Returns the resulting state.
  pub fn resume(&self) -> Result<LifecycleState> {
    let state = self.state()?;
    if state != LifecycleState::Parsed {
      return Ok(state);
    }

    let version = self.config.version.as_str();
    if self.storage.entry_count(version)? == 0 {
      return Ok(state);
    }

    if self.storage.active_version()?.as_deref() == Some(version) {
      self.set_state(LifecycleState::Activated)?;
      info!(version = %version, "Resumed activated cache version");
      return Ok(LifecycleState::Activated);
    }

    let mut lifecycle = self.lifecycle()?;
    lifecycle.state = LifecycleState::Installed;
    if self.config.skip_waiting {
      lifecycle.skip_waiting = true;
    }
    info!(version = %version, "Resumed installed cache version");
    Ok(LifecycleState::Installed)
  }

  /// Precache every manifest asset into the versioned cache.
  ///
  /// All assets are fetched before anything is stored: one failed or non-2xx
  /// fetch fails the whole install and nothing is committed. Returns the
  /// number of cached assets.
  pub async fn on_install(&self) -> Result<usize> {
    {
      let mut lifecycle = self.lifecycle()?;
      match lifecycle.state {
        LifecycleState::Parsed | LifecycleState::Redundant => {
          lifecycle.state = LifecycleState::Installing;
        }
        other => return Err(eyre!("Cannot install from state {:?}", other)),
      }
    }
    info!(version = %self.config.version, "Installing cache");

    match self.precache().await {
      Ok(count) => {
        let mut lifecycle = self.lifecycle()?;
        lifecycle.state = LifecycleState::Installed;
        if self.config.skip_waiting {
          lifecycle.skip_waiting = true;
        }
        info!(assets = count, "Cached assets");
        Ok(count)
      }
      Err(e) => {
        error!(error = %e, "Install failed");
        self.set_state(LifecycleState::Redundant)?;
        Err(e)
      }
    }
  }

  async fn precache(&self) -> Result<usize> {
    let version = self.config.version.as_str();
    self.storage.open(version)?;

    let network = self.network.as_ref();
    let fetches = self.router.manifest().urls().iter().map(|url| async move {
      let request = Request::get(url.clone());
      let response = network.fetch(&request).await?;
      if !response.is_ok() {
        return Err(NetworkError::Status {
          url: url.to_string(),
          status: response.status,
        });
      }
      Ok((request, response))
    });

    let entries = try_join_all(fetches)
      .await
      .map_err(|e| eyre!("Failed to precache assets: {}", e))?;

    self.storage.put_all(version, &entries)?;
    Ok(entries.len())
  }

  /// Delete stale caches and take control of every client.
  pub async fn on_activate(&self) -> Result<ActivationReport> {
    {
      let mut lifecycle = self.lifecycle()?;
      if lifecycle.state != LifecycleState::Installed {
        return Err(eyre!("Cannot activate from state {:?}", lifecycle.state));
      }
      if !lifecycle.skip_waiting {
        return Err(eyre!("Installed version is waiting to activate"));
      }
      lifecycle.state = LifecycleState::Activating;
    }
    info!(version = %self.config.version, "Activating cache");

    match self.collect_and_claim() {
      Ok(report) => {
        self.set_state(LifecycleState::Activated)?;
        Ok(report)
      }
      Err(e) => {
        self.set_state(LifecycleState::Installed)?;
        Err(e)
      }
    }
  }

  fn collect_and_claim(&self) -> Result<ActivationReport> {
    let mut deleted = Vec::new();
    for name in self.storage.keys()? {
      if name != self.config.version && name != self.config.offline_data {
        info!(cache = %name, "Deleting stale cache");
        self.storage.delete(&name)?;
        deleted.push(name);
      }
    }

    let claimed = self.clients.claim(&self.config.version)?;
    self.storage.set_active_version(&self.config.version)?;
    Ok(ActivationReport { deleted, claimed })
  }

  /// Intercept a request.
  ///
  /// Only an activated manager intercepts; dynamic endpoints (API paths,
  /// data files) are never intercepted.
  pub async fn on_fetch(&self, request: &Request) -> Result<FetchOutcome> {
    if self.state()? != LifecycleState::Activated {
      return Ok(FetchOutcome::Passthrough);
    }

    let served = match self.router.classify(&request.url) {
      Strategy::Passthrough => {
        debug!(url = %request.url, "Not intercepting");
        return Ok(FetchOutcome::Passthrough);
      }
      Strategy::CacheFirst => cache_first(self.storage.as_ref(), self.network.as_ref(), request).await?,
      Strategy::NetworkFirst => {
        network_first(
          self.storage.as_ref(),
          self.network.as_ref(),
          &self.config.version,
          &self.navigation_fallback,
          request,
        )
        .await?
      }
    };

    Ok(FetchOutcome::Respond(served))
  }

  /// Handle a message from an application context. Returns the reply to
  /// post, or `None` for messages the manager does not understand.
  pub async fn on_message(&self, message: &Value) -> Option<Reply> {
    let Some(message) = WorkerMessage::parse(message) else {
      debug!("Ignoring unrecognized message");
      return None;
    };

    Some(match message {
      WorkerMessage::SaveData { key, data } => {
        let success = match self.save_data(&key, &data) {
          Ok(()) => true,
          Err(e) => {
            warn!(key = %key, error = %e, "Failed to save offline data");
            false
          }
        };
        Reply::Ack { success }
      }
      WorkerMessage::GetData { key } => Reply::Data(self.load_data(&key)),
    })
  }

  fn save_data(&self, key: &str, data: &Value) -> Result<()> {
    let request = offline_data_request(&self.origin, key)?;
    let response = Response::json(data)?;
    self
      .storage
      .put(&self.config.offline_data, &request, &response)
  }

  fn load_data(&self, key: &str) -> Option<Value> {
    let found = offline_data_request(&self.origin, key)
      .and_then(|request| self.storage.match_in(&self.config.offline_data, &request));

    match found {
      Ok(Some(response)) => match response.parse_json() {
        Ok(value) => Some(value),
        Err(e) => {
          warn!(key = %key, error = %e, "Stored offline data is not valid JSON");
          None
        }
      },
      Ok(None) => None,
      Err(e) => {
        warn!(key = %key, error = %e, "Failed to read offline data");
        None
      }
    }
  }

  /// Handle a background sync trigger. Returns whether the tag was ours.
  pub async fn on_sync(&self, tag: &str) -> Result<bool> {
    if tag != self.config.sync_tag {
      debug!(tag = %tag, "Ignoring unknown sync tag");
      return Ok(false);
    }

    self.sync_handler.sync().await?;
    Ok(true)
  }

  pub fn status(&self) -> Result<CacheStatus> {
    let caches = self
      .storage
      .keys()?
      .into_iter()
      .map(|name| -> Result<(String, usize)> {
        let count = self.storage.entry_count(&name)?;
        Ok((name, count))
      })
      .collect::<Result<Vec<_>>>()?;

    Ok(CacheStatus {
      state: self.state()?,
      version: self.config.version.clone(),
      caches,
    })
  }
}
