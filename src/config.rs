use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

/// Environment variable overriding [`Config::origin`].
pub const ORIGIN_ENV: &str = "SMARTLOC_ORIGIN";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Origin the application is served from. Relative asset paths and the
  /// offline-data keys are resolved against it.
  pub origin: Url,
  /// Where the store, cache databases and logs live
  /// (default: $XDG_DATA_HOME/smartloc)
  pub data_dir: Option<PathBuf>,
  pub cache: CacheConfig,
  pub integrity: IntegrityConfig,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      origin: default_origin(),
      data_dir: None,
      cache: CacheConfig::default(),
      integrity: IntegrityConfig::default(),
    }
  }
}

fn default_origin() -> Url {
  Url::parse("http://localhost:8080/").expect("static origin is a valid URL")
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// Versioned asset cache name. Bump on incompatible asset-set changes.
  pub version: String,
  /// Offline-data cache name. Never garbage-collected.
  pub offline_data: String,
  /// Proceed straight from install to activation
  pub skip_waiting: bool,
  /// Asset manifest: relative paths (`./index.html`) or absolute URLs
  pub assets: Vec<String>,
  /// Document served to navigations when both network and cache miss
  pub navigation_fallback: String,
  pub passthrough: PassthroughConfig,
  /// Background sync tag that triggers the sync handler
  pub sync_tag: String,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      version: "smartloc-v2".to_string(),
      offline_data: "smartloc-offline-data".to_string(),
      skip_waiting: true,
      assets: [
        "./",
        "./index.html",
        "./config.html",
        "./gestion.html",
        "./comptabilite.html",
        "./parametres.html",
        "./login.html",
        "./reparation.html",
        "./synchronisation.js",
        "./pwa-setup.js",
        "./manifest.json",
        "./logo.png",
        "./timbre.png",
        "./logoapp.png",
        "https://cdn.jsdelivr.net/npm/bootstrap@5.3.0/dist/css/bootstrap.min.css",
        "https://cdn.jsdelivr.net/npm/bootstrap@5.3.0/dist/js/bootstrap.bundle.min.js",
      ]
      .into_iter()
      .map(String::from)
      .collect(),
      navigation_fallback: "./index.html".to_string(),
      passthrough: PassthroughConfig::default(),
      sync_tag: "sync-data".to_string(),
    }
  }
}

/// Requests the cache manager never intercepts.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PassthroughConfig {
  /// Path substrings marking dynamic endpoints
  pub path_markers: Vec<String>,
  /// Path suffixes marking data files
  pub extensions: Vec<String>,
}

impl Default for PassthroughConfig {
  fn default() -> Self {
    Self {
      path_markers: vec!["/api/".to_string()],
      extensions: vec![".json".to_string()],
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IntegrityConfig {
  /// Written into blank `ville`/`quartier` fields
  pub unspecified_label: String,
  /// Written into absent or zero `avance` fields
  pub default_advance: i64,
}

impl Default for IntegrityConfig {
  fn default() -> Self {
    Self {
      unspecified_label: "Non spécifié".to_string(),
      default_advance: 0,
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./smartloc.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/smartloc/config.yaml
  ///
  /// Without a config file every setting takes its default.
  /// `SMARTLOC_ORIGIN` overrides the origin in every case.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Self::default(),
    };

    if let Ok(origin) = std::env::var(ORIGIN_ENV) {
      config.origin = Url::parse(&origin)
        .map_err(|e| eyre!("Invalid {} '{}': {}", ORIGIN_ENV, origin, e))?;
    }

    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("smartloc.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("smartloc").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    Ok(config)
  }

  /// Resolve the data directory.
  pub fn data_dir(&self) -> Result<PathBuf> {
    if let Some(dir) = &self.data_dir {
      return Ok(dir.clone());
    }

    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("smartloc"))
  }

  pub fn store_path(&self) -> Result<PathBuf> {
    Ok(self.data_dir()?.join("store.db"))
  }

  pub fn cache_path(&self) -> Result<PathBuf> {
    Ok(self.data_dir()?.join("cache.db"))
  }

  pub fn log_dir(&self) -> Result<PathBuf> {
    Ok(self.data_dir()?.join("logs"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.cache.version, "smartloc-v2");
    assert_eq!(config.cache.offline_data, "smartloc-offline-data");
    assert!(config.cache.skip_waiting);
    assert_eq!(config.cache.assets.len(), 16);
    assert_eq!(config.integrity.unspecified_label, "Non spécifié");
    assert_eq!(config.integrity.default_advance, 0);
  }

  #[test]
  fn test_partial_yaml_keeps_defaults() {
    let config = Config::from_yaml(
      r#"
origin: "https://smartloc.example.com/app/"
cache:
  version: smartloc-v3
  assets: ["./", "./index.html"]
"#,
    )
    .unwrap();

    assert_eq!(config.origin.as_str(), "https://smartloc.example.com/app/");
    assert_eq!(config.cache.version, "smartloc-v3");
    assert_eq!(config.cache.assets.len(), 2);
    assert_eq!(config.cache.offline_data, "smartloc-offline-data");
    assert_eq!(config.cache.passthrough.path_markers, vec!["/api/"]);
    assert_eq!(config.integrity.unspecified_label, "Non spécifié");
  }

  #[test]
  fn test_explicit_data_dir() {
    let config = Config::from_yaml("data_dir: /tmp/smartloc-test\n").unwrap();
    assert_eq!(
      config.store_path().unwrap(),
      PathBuf::from("/tmp/smartloc-test/store.db")
    );
  }

  #[test]
  fn test_missing_explicit_path_is_an_error() {
    assert!(Config::load(Some(Path::new("/definitely/not/here.yaml"))).is_err());
  }
}
