//! Cache layer that applies TTL policy and JSON encoding on top of a storage
//! backend.

use chrono::{Duration, Utc};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{trace, warn};

use super::storage::NoopStorage;
use super::traits::{CacheKey, CacheStorage};
use crate::error::{Error, Result};

/// Default lifetime of a cache row: one day.
pub const DEFAULT_TTL_SECS: i64 = 24 * 60 * 60;

/// Cache layer used by the resource tree.
///
/// Reads and writes are best effort: a storage failure on read is reported
/// as a miss, a failure on write is logged and otherwise ignored. Only the
/// maintenance operations (`clear`, `purge_expired`) surface storage errors.
pub struct CacheLayer {
  storage: Arc<dyn CacheStorage>,
  /// Lifetime of rows whose kind has no override
  default_ttl: Duration,
  /// Per-kind lifetimes, keyed by kind name
  ttl_overrides: HashMap<String, Duration>,
}

impl CacheLayer {
  /// Create a new cache layer with the given storage backend.
  pub fn new(storage: impl CacheStorage + 'static) -> Self {
    Self {
      storage: Arc::new(storage),
      default_ttl: Duration::seconds(DEFAULT_TTL_SECS),
      ttl_overrides: HashMap::new(),
    }
  }

  /// A layer that never caches anything.
  pub fn disabled() -> Self {
    Self::new(NoopStorage)
  }

  /// Set the TTL for one kind (both its complete and partial rows).
  pub fn with_ttl(mut self, kind: impl Into<String>, ttl: Duration) -> Self {
    self.ttl_overrides.insert(kind.into(), ttl);
    self
  }

  pub fn ttl_for(&self, kind: &str) -> Duration {
    self
      .ttl_overrides
      .get(kind)
      .copied()
      .unwrap_or(self.default_ttl)
  }

  /// Read and decode a live row; anything else is a miss.
  pub fn load<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
    let bytes = match self.storage.get(key, Utc::now().timestamp()) {
      Ok(Some(bytes)) => bytes,
      Ok(None) => {
        trace!("cache miss {}", key);
        return None;
      }
      Err(e) => {
        warn!("Treating {} as a cache miss: {}", key, e);
        return None;
      }
    };

    match serde_json::from_slice(&bytes) {
      Ok(value) => {
        trace!("cache hit {}", key);
        Some(value)
      }
      Err(e) => {
        warn!("Discarding undecodable cache row {}: {}", key, e);
        None
      }
    }
  }

  /// Encode and upsert a row with the kind's TTL.
  pub fn store<T: Serialize + ?Sized>(&self, key: &CacheKey, value: &T) {
    let expires = Utc::now()
      .timestamp()
      .saturating_add(self.ttl_for(key.kind()).num_seconds());

    let result = serde_json::to_vec(value)
      .map_err(Error::from)
      .and_then(|data| self.storage.put(key, &data, expires));

    if let Err(e) = result {
      warn!("Failed to cache {}: {}", key, e);
    }
  }

  /// Drop a row, if present.
  pub fn evict(&self, key: &CacheKey) {
    if let Err(e) = self.storage.remove(key) {
      warn!("Failed to evict {}: {}", key, e);
    }
  }

  /// Delete every cached row.
  pub fn clear(&self) -> Result<()> {
    self.storage.delete_all()
  }

  /// Delete every expired row.
  pub fn purge_expired(&self) -> Result<usize> {
    self.storage.purge_expired(Utc::now().timestamp())
  }
}

impl Clone for CacheLayer {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      default_ttl: self.default_ttl,
      ttl_overrides: self.ttl_overrides.clone(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::SqliteStorage;
  use serde_json::{json, Value};

  fn layer() -> CacheLayer {
    CacheLayer::new(SqliteStorage::open_in_memory().unwrap())
  }

  #[test]
  fn test_store_then_load() {
    let cache = layer();
    let key = CacheKey::new("Repo", "repo=x,user=alice");

    cache.store(&key, &json!({"name": "x"}));

    assert_eq!(cache.load::<Value>(&key), Some(json!({"name": "x"})));
  }

  #[test]
  fn test_zero_ttl_is_a_miss_on_next_load() {
    let cache = layer().with_ttl("Repo", Duration::zero());
    let key = CacheKey::new("Repo", "repo=x,user=alice");

    cache.store(&key, &json!({"name": "x"}));

    assert_eq!(cache.load::<Value>(&key), None);
  }

  #[test]
  fn test_override_applies_to_partial_variant() {
    let cache = layer().with_ttl("Repo", Duration::zero());
    let partial = CacheKey::partial("Repo", "repo=x,user=alice");
    let other = CacheKey::new("User", "user=alice");

    cache.store(&partial, &json!({"name": "x"}));
    cache.store(&other, &json!({"login": "alice"}));

    assert_eq!(cache.load::<Value>(&partial), None);
    assert!(cache.load::<Value>(&other).is_some());
  }

  #[test]
  fn test_longest_ttl_does_not_overflow_expiry() {
    let cache = layer().with_ttl("Repo", Duration::MAX);
    let key = CacheKey::new("Repo", "repo=x,user=alice");

    cache.store(&key, &json!({"name": "x"}));

    assert_eq!(cache.load::<Value>(&key), Some(json!({"name": "x"})));
  }

  #[test]
  fn test_undecodable_row_is_a_miss() {
    let storage = Arc::new(SqliteStorage::open_in_memory().unwrap());
    let key = CacheKey::new("Repo", "repo=x");
    storage.put(&key, b"not json", i64::MAX).unwrap();

    let cache = CacheLayer {
      storage,
      default_ttl: Duration::seconds(DEFAULT_TTL_SECS),
      ttl_overrides: HashMap::new(),
    };

    assert_eq!(cache.load::<Value>(&key), None);
  }

  #[test]
  fn test_disabled_layer_never_hits() {
    let cache = CacheLayer::disabled();
    let key = CacheKey::new("Repo", "repo=x");

    cache.store(&key, &json!(1));

    assert_eq!(cache.load::<Value>(&key), None);
  }
}
