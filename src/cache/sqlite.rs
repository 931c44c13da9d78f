//! SQLite-backed cache storage.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::Mutex;

use super::storage::CacheStorage;
use super::types::{Request, Response};

/// Schema for cache tables.
const CACHE_SCHEMA: &str = r#"
-- Named caches; rowid gives creation order
CREATE TABLE IF NOT EXISTS caches (
    name TEXT PRIMARY KEY,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Cached responses keyed by request URL
CREATE TABLE IF NOT EXISTS cache_entries (
    cache_name TEXT NOT NULL,
    request_key TEXT NOT NULL,
    status INTEGER NOT NULL,
    content_type TEXT,
    body BLOB NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (cache_name, request_key)
);

CREATE INDEX IF NOT EXISTS idx_cache_entries_key ON cache_entries(request_key);

-- Lifecycle bookkeeping that outlives the process
CREATE TABLE IF NOT EXISTS cache_state (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

const ACTIVE_VERSION_KEY: &str = "active_version";

/// Cache storage persisted in SQLite.
pub struct SqliteCacheStorage {
  conn: Mutex<Connection>,
}

impl SqliteCacheStorage {
  /// Open (or create) the cache database at `path`.
  pub fn open_at(path: &Path) -> Result<Self> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::with_connection(conn)
  }

  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory cache database: {}", e))?;
    Self::with_connection(conn)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
    self.conn.lock().map_err(|e| eyre!("Lock poisoned: {}", e))
  }
}

fn ensure_cache(conn: &Connection, cache_name: &str) -> Result<()> {
  conn
    .execute(
      "INSERT OR IGNORE INTO caches (name) VALUES (?)",
      params![cache_name],
    )
    .map_err(|e| eyre!("Failed to open cache {}: {}", cache_name, e))?;
  Ok(())
}

fn insert_entry(conn: &Connection, cache_name: &str, request: &Request, response: &Response) -> Result<()> {
  conn
    .execute(
      "INSERT OR REPLACE INTO cache_entries (cache_name, request_key, status, content_type, body, cached_at)
       VALUES (?, ?, ?, ?, ?, datetime('now'))",
      params![
        cache_name,
        request.cache_key(),
        response.status,
        response.content_type,
        response.body
      ],
    )
    .map_err(|e| eyre!("Failed to store cache entry: {}", e))?;
  Ok(())
}

fn row_to_response(row: &Row<'_>) -> rusqlite::Result<Response> {
  Ok(Response {
    status: row.get(0)?,
    content_type: row.get(1)?,
    body: row.get(2)?,
  })
}

impl CacheStorage for SqliteCacheStorage {
  fn open(&self, cache_name: &str) -> Result<()> {
    let conn = self.lock()?;
    ensure_cache(&conn, cache_name)
  }

  fn keys(&self) -> Result<Vec<String>> {
    let conn = self.lock()?;
    let mut stmt = conn
      .prepare("SELECT name FROM caches ORDER BY rowid")
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let names = stmt
      .query_map([], |row| row.get(0))
      .map_err(|e| eyre!("Failed to list caches: {}", e))?
      .filter_map(|r| r.ok())
      .collect();

    Ok(names)
  }

  fn delete(&self, cache_name: &str) -> Result<bool> {
    let mut conn = self.lock()?;
    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    tx.execute(
      "DELETE FROM cache_entries WHERE cache_name = ?",
      params![cache_name],
    )
    .map_err(|e| eyre!("Failed to delete cache entries: {}", e))?;
    let removed = tx
      .execute("DELETE FROM caches WHERE name = ?", params![cache_name])
      .map_err(|e| eyre!("Failed to delete cache {}: {}", cache_name, e))?;

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    Ok(removed > 0)
  }

  fn put(&self, cache_name: &str, request: &Request, response: &Response) -> Result<()> {
    let conn = self.lock()?;
    ensure_cache(&conn, cache_name)?;
    insert_entry(&conn, cache_name, request, response)
  }

  fn put_all(&self, cache_name: &str, entries: &[(Request, Response)]) -> Result<()> {
    let mut conn = self.lock()?;
    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    ensure_cache(&tx, cache_name)?;
    for (request, response) in entries {
      insert_entry(&tx, cache_name, request, response)?;
    }

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    Ok(())
  }

  fn match_in(&self, cache_name: &str, request: &Request) -> Result<Option<Response>> {
    let conn = self.lock()?;
    conn
      .query_row(
        "SELECT status, content_type, body FROM cache_entries
         WHERE cache_name = ? AND request_key = ?",
        params![cache_name, request.cache_key()],
        row_to_response,
      )
      .optional()
      .map_err(|e| eyre!("Failed to look up cache entry: {}", e))
  }

  fn match_any(&self, request: &Request) -> Result<Option<Response>> {
    let conn = self.lock()?;
    conn
      .query_row(
        "SELECT e.status, e.content_type, e.body FROM cache_entries e
         INNER JOIN caches c ON c.name = e.cache_name
         WHERE e.request_key = ?
         ORDER BY c.rowid
         LIMIT 1",
        params![request.cache_key()],
        row_to_response,
      )
      .optional()
      .map_err(|e| eyre!("Failed to look up cache entry: {}", e))
  }

  fn entry_count(&self, cache_name: &str) -> Result<usize> {
    let conn = self.lock()?;
    let count: i64 = conn
      .query_row(
        "SELECT COUNT(*) FROM cache_entries WHERE cache_name = ?",
        params![cache_name],
        |row| row.get(0),
      )
      .map_err(|e| eyre!("Failed to count cache entries: {}", e))?;

    Ok(count as usize)
  }

  fn active_version(&self) -> Result<Option<String>> {
    let conn = self.lock()?;
    conn
      .query_row(
        "SELECT value FROM cache_state WHERE key = ?",
        params![ACTIVE_VERSION_KEY],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read active version: {}", e))
  }

  fn set_active_version(&self, version: &str) -> Result<()> {
    let conn = self.lock()?;
    conn
      .execute(
        "INSERT OR REPLACE INTO cache_state (key, value) VALUES (?, ?)",
        params![ACTIVE_VERSION_KEY, version],
      )
      .map_err(|e| eyre!("Failed to record active version: {}", e))?;
    Ok(())
  }
}
