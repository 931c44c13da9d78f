//! Network seam used by the cache strategies.

use futures::future::BoxFuture;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;

use super::types::{Request, Response};

#[derive(Error, Debug)]
pub enum NetworkError {
  #[error("Network unreachable for {url}: {reason}")]
  Unreachable { url: String, reason: String },

  #[error("HTTP error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("Unexpected status {status} for {url}")]
  Status { url: String, status: u16 },
}

/// Something that can perform a request.
///
/// Like the browser `fetch`, an HTTP error status is still a successful
/// fetch; only transport failures are errors.
pub trait Network: Send + Sync {
  fn fetch<'a>(&'a self, request: &'a Request) -> BoxFuture<'a, Result<Response, NetworkError>>;
}

/// [`Network`] backed by a reqwest client.
#[derive(Clone)]
pub struct HttpNetwork {
  client: reqwest::Client,
}

impl HttpNetwork {
  pub fn new() -> Result<Self, NetworkError> {
    let client = reqwest::Client::builder()
      .user_agent(concat!("smartloc/", env!("CARGO_PKG_VERSION")))
      .build()?;
    Ok(Self { client })
  }
}

impl Network for HttpNetwork {
  fn fetch<'a>(&'a self, request: &'a Request) -> BoxFuture<'a, Result<Response, NetworkError>> {
    Box::pin(async move {
      let response = self
        .client
        .request(request.method.clone(), request.url.clone())
        .send()
        .await?;

      let status = response.status().as_u16();
      let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
      let body = response.bytes().await?.to_vec();

      Ok(Response {
        status,
        content_type,
        body,
      })
    })
  }
}
