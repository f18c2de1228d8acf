//! Cache storage implementations: SQLite and a no-op backend.

use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use super::traits::{CacheKey, CacheStorage};
use crate::error::{Error, Result};

/// Storage implementation that doesn't cache anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStorage;

impl CacheStorage for NoopStorage {
  fn get(&self, _key: &CacheKey, _now: i64) -> Result<Option<Vec<u8>>> {
    Ok(None) // Always miss
  }

  fn put(&self, _key: &CacheKey, _data: &[u8], _expires: i64) -> Result<()> {
    Ok(()) // Discard
  }

  fn remove(&self, _key: &CacheKey) -> Result<()> {
    Ok(())
  }

  fn purge_expired(&self, _now: i64) -> Result<usize> {
    Ok(0)
  }

  fn delete_all(&self) -> Result<()> {
    Ok(())
  }
}

/// SQLite-based cache storage implementation.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

/// Schema for the cache table.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS cache (
    identifier TEXT NOT NULL,
    parameters TEXT NOT NULL,
    expires INTEGER NOT NULL,
    data BLOB NOT NULL,
    PRIMARY KEY (identifier, parameters)
);

CREATE INDEX IF NOT EXISTS idx_cache_expires ON cache(expires);
"#;

impl SqliteStorage {
  /// Open (or create) the cache database at `path`.
  pub fn open(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| Error::Storage(format!("Failed to create cache directory: {}", e)))?;
    }

    let conn = Connection::open(path).map_err(|e| {
      Error::Storage(format!(
        "Failed to open cache database at {}: {}",
        path.display(),
        e
      ))
    })?;

    debug!("Opened cache database at {}", path.display());
    Self::with_connection(conn)
  }

  /// Open a private in-memory database.
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| Error::Storage(format!("Failed to open in-memory cache: {}", e)))?;
    Self::with_connection(conn)
  }

  /// Get the default database path.
  pub fn default_path() -> Result<PathBuf> {
    let cache_dir = dirs::cache_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".cache")))
      .ok_or_else(|| Error::Storage("Could not determine cache directory".to_string()))?;

    Ok(cache_dir.join("ghtree").join("cache.db"))
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;
    Ok(storage)
  }

  fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
    self
      .conn
      .lock()
      .map_err(|e| Error::Storage(format!("Lock poisoned: {}", e)))
  }

  /// Run database migrations for the cache table.
  fn run_migrations(&self) -> Result<()> {
    let conn = self.lock()?;

    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| Error::Storage(format!("Failed to run cache migrations: {}", e)))?;

    Ok(())
  }
}

fn purge(conn: &Connection, now: i64) -> Result<usize> {
  conn
    .execute("DELETE FROM cache WHERE expires <= ?", params![now])
    .map_err(|e| Error::Storage(format!("Failed to purge expired rows: {}", e)))
}

impl CacheStorage for SqliteStorage {
  fn get(&self, key: &CacheKey, now: i64) -> Result<Option<Vec<u8>>> {
    let conn = self.lock()?;

    purge(&conn, now)?;

    conn
      .query_row(
        "SELECT data FROM cache
         WHERE identifier = ? AND parameters = ? AND expires > ?",
        params![key.identifier(), key.params(), now],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| Error::Storage(format!("Failed to read {}: {}", key, e)))
  }

  fn put(&self, key: &CacheKey, data: &[u8], expires: i64) -> Result<()> {
    let conn = self.lock()?;

    conn
      .execute(
        "INSERT OR REPLACE INTO cache (identifier, parameters, expires, data)
         VALUES (?, ?, ?, ?)",
        params![key.identifier(), key.params(), expires, data],
      )
      .map_err(|e| Error::Storage(format!("Failed to store {}: {}", key, e)))?;

    Ok(())
  }

  fn remove(&self, key: &CacheKey) -> Result<()> {
    let conn = self.lock()?;

    conn
      .execute(
        "DELETE FROM cache WHERE identifier = ? AND parameters = ?",
        params![key.identifier(), key.params()],
      )
      .map_err(|e| Error::Storage(format!("Failed to remove {}: {}", key, e)))?;

    Ok(())
  }

  fn purge_expired(&self, now: i64) -> Result<usize> {
    let conn = self.lock()?;
    purge(&conn, now)
  }

  fn delete_all(&self) -> Result<()> {
    let conn = self.lock()?;

    conn
      .execute("DELETE FROM cache", [])
      .map_err(|e| Error::Storage(format!("Failed to clear cache: {}", e)))?;

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn count_rows(storage: &SqliteStorage) -> i64 {
    let conn = storage.lock().unwrap();
    conn
      .query_row("SELECT COUNT(*) FROM cache", [], |row| row.get(0))
      .unwrap()
  }

  #[test]
  fn test_put_then_get() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    let key = CacheKey::new("Repo", "repo=x,user=alice");

    storage.put(&key, b"{\"id\":1}", 1_000).unwrap();

    assert_eq!(
      storage.get(&key, 500).unwrap(),
      Some(b"{\"id\":1}".to_vec())
    );
    assert_eq!(
      storage.get(&CacheKey::partial("Repo", "repo=x,user=alice"), 500).unwrap(),
      None
    );
  }

  #[test]
  fn test_last_write_wins() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    let key = CacheKey::new("User", "user=alice");

    storage.put(&key, b"1", 1_000).unwrap();
    storage.put(&key, b"2", 1_000).unwrap();

    assert_eq!(storage.get(&key, 0).unwrap(), Some(b"2".to_vec()));
    assert_eq!(count_rows(&storage), 1);
  }

  #[test]
  fn test_expiry_boundary_is_a_miss() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    let key = CacheKey::new("User", "user=alice");

    storage.put(&key, b"1", 100).unwrap();

    assert_eq!(storage.get(&key, 100).unwrap(), None);
  }

  #[test]
  fn test_get_purges_unrelated_expired_rows() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    storage
      .put(&CacheKey::new("User", "user=old"), b"1", 10)
      .unwrap();
    storage
      .put(&CacheKey::new("User", "user=new"), b"2", 1_000)
      .unwrap();

    storage
      .get(&CacheKey::new("Repo", "repo=x"), 500)
      .unwrap();

    assert_eq!(count_rows(&storage), 1);
  }

  #[test]
  fn test_remove_and_delete_all() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    let a = CacheKey::new("User", "user=a");
    let b = CacheKey::new("User", "user=b");
    storage.put(&a, b"a", 1_000).unwrap();
    storage.put(&b, b"b", 1_000).unwrap();

    storage.remove(&a).unwrap();
    assert_eq!(storage.get(&a, 0).unwrap(), None);
    assert!(storage.get(&b, 0).unwrap().is_some());

    storage.delete_all().unwrap();
    assert_eq!(count_rows(&storage), 0);
  }

  #[test]
  fn test_purge_expired_reports_count() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    storage.put(&CacheKey::new("A", ""), b"1", 10).unwrap();
    storage.put(&CacheKey::new("B", ""), b"1", 20).unwrap();
    storage.put(&CacheKey::new("C", ""), b"1", 30).unwrap();

    assert_eq!(storage.purge_expired(20).unwrap(), 2);
  }

  #[test]
  fn test_persists_across_reopen() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("nested").join("cache.db");
    let key = CacheKey::new("Org", "org=acme");

    {
      let storage = SqliteStorage::open(&path).unwrap();
      storage.put(&key, b"acme", i64::MAX).unwrap();
    }

    let storage = SqliteStorage::open(&path).unwrap();
    assert_eq!(storage.get(&key, 0).unwrap(), Some(b"acme".to_vec()));
  }

  #[test]
  fn test_noop_always_misses() {
    let key = CacheKey::new("User", "user=a");
    NoopStorage.put(&key, b"a", i64::MAX).unwrap();
    assert_eq!(NoopStorage.get(&key, 0).unwrap(), None);
  }
}
