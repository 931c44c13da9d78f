//! Cache-first and network-first serving strategies.

use color_eyre::Result;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use super::network::Network;
use super::storage::CacheStorage;
use super::types::{Request, Response};

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheSource {
  /// Fresh from the network
  Network,
  /// Cached copy of the requested URL
  Cache,
  /// Network failed; the root document was served to a navigation
  NavigationFallback,
}

/// A response together with its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served {
  pub response: Response,
  pub source: CacheSource,
}

impl Served {
  pub fn from_network(response: Response) -> Self {
    Self {
      response,
      source: CacheSource::Network,
    }
  }

  pub fn from_cache(response: Response) -> Self {
    Self {
      response,
      source: CacheSource::Cache,
    }
  }
}

/// Look `request` up across all caches. Storage failures count as a miss.
fn lookup<S: CacheStorage + ?Sized>(storage: &S, request: &Request) -> Option<Response> {
  if !request.is_cacheable() {
    return None;
  }

  match storage.match_any(request) {
    Ok(hit) => hit,
    Err(e) => {
      warn!(url = %request.url, error = %e, "Cache lookup failed, treating as miss");
      None
    }
  }
}

/// Serve from cache when present; otherwise fetch without storing.
pub async fn cache_first<S, N>(storage: &S, network: &N, request: &Request) -> Result<Served>
where
  S: CacheStorage + ?Sized,
  N: Network + ?Sized,
{
  if let Some(cached) = lookup(storage, request) {
    debug!(url = %request.url, "Cache hit");
    return Ok(Served::from_cache(cached));
  }

  let response = network.fetch(request).await?;
  Ok(Served::from_network(response))
}

/// Prefer the network and keep a copy in `cache_name`; fall back to any
/// cached copy, then (for navigations) to `fallback_document`.
pub async fn network_first<S, N>(
  storage: &S,
  network: &N,
  cache_name: &str,
  fallback_document: &Url,
  request: &Request,
) -> Result<Served>
where
  S: CacheStorage + ?Sized,
  N: Network + ?Sized,
{
  let error = match network.fetch(request).await {
    Ok(response) => {
      if request.is_cacheable() {
        if let Err(e) = storage.put(cache_name, request, &response) {
          warn!(url = %request.url, error = %e, "Failed to update cache");
        }
      }
      return Ok(Served::from_network(response));
    }
    Err(e) => e,
  };

  debug!(url = %request.url, error = %error, "Network failed, trying cache");

  if let Some(cached) = lookup(storage, request) {
    return Ok(Served::from_cache(cached));
  }

  if request.is_navigation() {
    if let Some(document) = lookup(storage, &Request::get(fallback_document.clone())) {
      return Ok(Served {
        response: document,
        source: CacheSource::NavigationFallback,
      });
    }
  }

  Err(error.into())
}
