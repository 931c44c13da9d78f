//! Test doubles for the cache module.

use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use url::Url;

use super::network::{Network, NetworkError};
use super::types::{Request, Response};

/// Scripted network: serves registered URLs, fails everything else.
#[derive(Debug, Default)]
pub struct FakeNetwork {
  responses: HashMap<String, Response>,
  offline: AtomicBool,
  calls: AtomicUsize,
}

impl FakeNetwork {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn serve(mut self, url: Url, response: Response) -> Self {
    self.responses.insert(url.into(), response);
    self
  }

  pub fn offline(self) -> Self {
    self.set_offline(true);
    self
  }

  pub fn set_offline(&self, offline: bool) {
    self.offline.store(offline, Ordering::SeqCst);
  }

  /// Number of fetches attempted so far.
  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

impl Network for FakeNetwork {
  fn fetch<'a>(&'a self, request: &'a Request) -> BoxFuture<'a, Result<Response, NetworkError>> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    let result = if self.offline.load(Ordering::SeqCst) {
      Err(NetworkError::Unreachable {
        url: request.url.to_string(),
        reason: "offline".to_string(),
      })
    } else {
      self
        .responses
        .get(request.url.as_str())
        .cloned()
        .ok_or_else(|| NetworkError::Unreachable {
          url: request.url.to_string(),
          reason: "connection refused".to_string(),
        })
    };
    Box::pin(async move { result })
  }
}
