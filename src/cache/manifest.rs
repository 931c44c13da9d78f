//! Static asset manifest and per-request strategy selection.

use color_eyre::{eyre::eyre, Result};
use url::Url;

use crate::config::PassthroughConfig;

/// How an intercepted request is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
  /// Not intercepted; goes straight to the network
  Passthrough,
  CacheFirst,
  NetworkFirst,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Matcher {
  /// App root (`./`): matches only the origin's own path
  Root(String),
  /// Relative asset: matches any path ending with it
  Suffix(String),
  /// Absolute URL: matches that URL exactly (ignoring fragment)
  Exact(Url),
}

/// The fixed list of assets precached at install.
#[derive(Debug, Clone)]
pub struct AssetManifest {
  urls: Vec<Url>,
  matchers: Vec<Matcher>,
}

impl AssetManifest {
  /// Resolve `assets` against `origin`. Entries are either relative paths
  /// (`./index.html`) or absolute URLs.
  pub fn new(origin: &Url, assets: &[String]) -> Result<Self> {
    let mut urls = Vec::with_capacity(assets.len());
    let mut matchers = Vec::with_capacity(assets.len());

    for asset in assets {
      match Url::parse(asset) {
        Ok(mut absolute) => {
          absolute.set_fragment(None);
          urls.push(absolute.clone());
          matchers.push(Matcher::Exact(absolute));
        }
        Err(url::ParseError::RelativeUrlWithoutBase) => {
          let resolved = origin
            .join(asset)
            .map_err(|e| eyre!("Invalid asset path '{}': {}", asset, e))?;
          let suffix = asset.trim_start_matches("./").trim_start_matches('/');
          matchers.push(if suffix.is_empty() {
            Matcher::Root(resolved.path().to_string())
          } else {
            Matcher::Suffix(suffix.to_string())
          });
          urls.push(resolved);
        }
        Err(e) => return Err(eyre!("Invalid asset URL '{}': {}", asset, e)),
      }
    }

    Ok(Self { urls, matchers })
  }

  /// Absolute URLs to precache.
  pub fn urls(&self) -> &[Url] {
    &self.urls
  }

  pub fn contains(&self, url: &Url) -> bool {
    let path = url.path();
    self.matchers.iter().any(|m| match m {
      Matcher::Root(root) => path == root,
      Matcher::Suffix(suffix) => path.ends_with(suffix.as_str()),
      Matcher::Exact(exact) => {
        let mut candidate = url.clone();
        candidate.set_fragment(None);
        &candidate == exact
      }
    })
  }
}

/// Chooses a [`Strategy`] for each request URL.
#[derive(Debug, Clone)]
pub struct RequestRouter {
  manifest: AssetManifest,
  passthrough: PassthroughConfig,
}

impl RequestRouter {
  pub fn new(manifest: AssetManifest, passthrough: PassthroughConfig) -> Self {
    Self {
      manifest,
      passthrough,
    }
  }

  pub fn manifest(&self) -> &AssetManifest {
    &self.manifest
  }

  pub fn classify(&self, url: &Url) -> Strategy {
    let path = url.path();
    let dynamic = self
      .passthrough
      .path_markers
      .iter()
      .any(|m| path.contains(m.as_str()))
      || self
        .passthrough
        .extensions
        .iter()
        .any(|ext| path.ends_with(ext.as_str()));

    if dynamic {
      Strategy::Passthrough
    } else if self.manifest.contains(url) {
      Strategy::CacheFirst
    } else {
      Strategy::NetworkFirst
    }
  }
}
