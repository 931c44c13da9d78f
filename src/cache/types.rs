//! Request and response values flowing through the cache manager.

use color_eyre::{eyre::eyre, Result};
use serde::{de::DeserializeOwned, Serialize};
use url::Url;

pub use reqwest::Method;

/// How a request was initiated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RequestMode {
  /// Top-level page navigation
  Navigate,
  /// Anything else (scripts, styles, images, XHR)
  #[default]
  Subresource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
  pub url: Url,
  pub method: Method,
  pub mode: RequestMode,
}

impl Request {
  pub fn get(url: Url) -> Self {
    Self {
      url,
      method: Method::GET,
      mode: RequestMode::Subresource,
    }
  }

  pub fn navigate(url: Url) -> Self {
    Self {
      mode: RequestMode::Navigate,
      ..Self::get(url)
    }
  }

  pub fn is_navigation(&self) -> bool {
    self.mode == RequestMode::Navigate
  }

  /// Only GET requests are stored in or served from a cache.
  pub fn is_cacheable(&self) -> bool {
    self.method == Method::GET
  }

  /// Key under which this request is cached: the URL without fragment.
  pub fn cache_key(&self) -> String {
    let mut url = self.url.clone();
    url.set_fragment(None);
    url.into()
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
  pub status: u16,
  pub content_type: Option<String>,
  pub body: Vec<u8>,
}

impl Response {
  pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
    Self {
      status,
      content_type: None,
      body: body.into(),
    }
  }

  pub fn ok(body: impl Into<Vec<u8>>) -> Self {
    Self::new(200, body)
  }

  /// A 200 response carrying `value` serialized as JSON.
  pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
    let body = serde_json::to_vec(value).map_err(|e| eyre!("Failed to serialize body: {}", e))?;
    Ok(Self::ok(body).with_content_type("application/json"))
  }

  pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
    self.content_type = Some(content_type.into());
    self
  }

  /// 2xx status
  pub fn is_ok(&self) -> bool {
    (200..300).contains(&self.status)
  }

  pub fn parse_json<T: DeserializeOwned>(&self) -> Result<T> {
    serde_json::from_slice(&self.body).map_err(|e| eyre!("Failed to parse response body: {}", e))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_cache_key_drops_fragment_keeps_query() {
    let request = Request::get(Url::parse("https://a.test/x.html?v=2#top").unwrap());
    assert_eq!(request.cache_key(), "https://a.test/x.html?v=2");
  }

  #[test]
  fn test_only_get_is_cacheable() {
    let mut request = Request::get(Url::parse("https://a.test/").unwrap());
    assert!(request.is_cacheable());
    request.method = Method::POST;
    assert!(!request.is_cacheable());
  }

  #[test]
  fn test_json_response() {
    let response = Response::json(&serde_json::json!({"a": 1})).unwrap();
    assert!(response.is_ok());
    assert_eq!(response.content_type.as_deref(), Some("application/json"));
    let value: serde_json::Value = response.parse_json().unwrap();
    assert_eq!(value["a"], 1);
  }
}
