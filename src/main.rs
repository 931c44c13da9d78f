use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing::warn;

use smartloc::bootstrap::DefaultSmartLoc;
use smartloc::cache::{FetchOutcome, Request};
use smartloc::config::Config;
use smartloc::logging;
use smartloc::store::{LocalStore, StoreKey};

#[derive(Parser, Debug)]
#[command(name = "smartloc")]
#[command(about = "Offline cache and data integrity tools for SmartLoc")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/smartloc/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Migrate, synchronize and verify the local store
  Init,
  /// Upgrade legacy apartment records
  Migrate,
  /// Drop apartments whose owner no longer exists
  Sync,
  /// Report referential problems
  Verify,
  /// Raw access to the local store
  #[command(subcommand)]
  Store(StoreCommand),
  /// Drive the offline cache manager
  #[command(subcommand)]
  Cache(CacheCommand),
}

#[derive(Subcommand, Debug)]
enum StoreCommand {
  /// Print the JSON stored under a key
  Get { key: String },
  /// Store a JSON value under a key
  Set { key: String, json: String },
}

#[derive(Subcommand, Debug)]
enum CacheCommand {
  /// Precache the asset manifest and activate the cache
  Install,
  /// Show the lifecycle state and every cache
  Status,
  /// Activate an installed version that is waiting
  SkipWaiting,
  /// Resolve a request the way the cache manager would
  Fetch {
    url: String,
    /// Treat the request as a page navigation
    #[arg(long)]
    navigate: bool,
  },
  /// Save a JSON blob to the offline-data cache
  Save { key: String, json: String },
  /// Print a blob from the offline-data cache
  Get { key: String },
  /// Trigger a background sync
  Sync {
    #[arg(default_value = "sync-data")]
    tag: String,
  },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
  let out = serde_json::to_string_pretty(value)
    .map_err(|e| eyre!("Failed to serialize output: {}", e))?;
  println!("{}", out);
  Ok(())
}

fn parse_json(raw: &str) -> Result<Value> {
  serde_json::from_str(raw).map_err(|e| eyre!("Invalid JSON argument: {}", e))
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let config = Config::load(args.config.as_deref())?;
  let _log_guard = logging::init(&config.log_dir()?)?;

  let app = DefaultSmartLoc::open(&config)?;

  match args.command {
    Command::Init => print_json(&app.start_session()?)?,
    Command::Migrate => {
      let migrated = app.integrity().migrate_legacy_records()?;
      print_json(&json!({ "migrated": migrated }))?;
    }
    Command::Sync => print_json(&app.integrity().synchronize_owners()?)?,
    Command::Verify => print_json(&app.integrity().verify_integrity())?,
    Command::Store(command) => run_store(&app, command)?,
    Command::Cache(command) => run_cache(&app, &config, command).await?,
  }

  Ok(())
}

fn check_key(key: &str) {
  if StoreKey::from_name(key).is_none() {
    warn!(key = %key, "Not a key the application reads");
    eprintln!("warning: '{}' is not a key the application reads", key);
  }
}

fn run_store(app: &DefaultSmartLoc, command: StoreCommand) -> Result<()> {
  let store = app.integrity().store();

  match &command {
    StoreCommand::Get { key } | StoreCommand::Set { key, .. } => check_key(key),
  }

  match command {
    StoreCommand::Get { key } => match store.get_raw(&key)? {
      Some(raw) => println!("{}", raw),
      None => return Err(eyre!("No value stored under '{}'", key)),
    },
    StoreCommand::Set { key, json } => {
      let value = parse_json(&json)?;
      store.set_raw(&key, &value.to_string())?;
    }
  }

  Ok(())
}

async fn run_cache(app: &DefaultSmartLoc, config: &Config, command: CacheCommand) -> Result<()> {
  match command {
    CacheCommand::Status => {
      app.cache().resume()?;
      return print_json(&app.cache().status()?);
    }
    CacheCommand::SkipWaiting => {
      let report = app.skip_waiting().await?;
      return print_json(&json!({ "activation": report, "status": app.cache().status()? }));
    }
    _ => {}
  }

  let active = app.start_worker().await?;

  match command {
    CacheCommand::Install | CacheCommand::Status | CacheCommand::SkipWaiting => {
      print_json(&json!({ "active": active, "status": app.cache().status()? }))?
    }
    CacheCommand::Fetch { url, navigate } => {
      let url = config
        .origin
        .join(&url)
        .map_err(|e| eyre!("Invalid URL '{}': {}", url, e))?;
      let request = if navigate {
        Request::navigate(url)
      } else {
        Request::get(url)
      };

      match app.worker().fetch(request).await? {
        FetchOutcome::Passthrough => print_json(&json!({ "outcome": "passthrough" }))?,
        FetchOutcome::Respond(served) => print_json(&json!({
          "outcome": "respond",
          "source": served.source,
          "status": served.response.status,
          "content_type": served.response.content_type,
          "bytes": served.response.body.len(),
        }))?,
      }
    }
    CacheCommand::Save { key, json } => {
      let client = app.connect_client()?;
      let saved = client.save_for_offline(&key, parse_json(&json)?).await?;
      print_json(&json!({ "success": saved }))?;
    }
    CacheCommand::Get { key } => {
      let client = app.connect_client()?;
      print_json(&client.get_offline_data(&key).await?)?;
    }
    CacheCommand::Sync { tag } => {
      let handled = app.worker().sync(tag).await?;
      print_json(&json!({ "handled": handled }))?;
    }
  }

  Ok(())
}
