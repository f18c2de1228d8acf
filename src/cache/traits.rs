//! Core traits and types for the caching system.

use std::fmt;

use crate::error::Result;

/// Suffix appended to a kind name for data that came from a listing.
pub const PARTIAL_SUFFIX: &str = "_partial";

/// Composite key of a cache row: (identifier, canonical parameters).
///
/// The identifier is the node kind name, optionally followed by
/// [`PARTIAL_SUFFIX`] for the partial variant of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
  kind: String,
  partial: bool,
  params: String,
}

impl CacheKey {
  pub fn new(kind: impl Into<String>, params: impl Into<String>) -> Self {
    Self {
      kind: kind.into(),
      partial: false,
      params: params.into(),
    }
  }

  pub fn partial(kind: impl Into<String>, params: impl Into<String>) -> Self {
    Self {
      partial: true,
      ..Self::new(kind, params)
    }
  }

  /// Kind name without the variant suffix; TTL overrides are looked up by it.
  pub fn kind(&self) -> &str {
    &self.kind
  }

  /// Value stored in the `identifier` column.
  pub fn identifier(&self) -> String {
    if self.partial {
      format!("{}{}", self.kind, PARTIAL_SUFFIX)
    } else {
      self.kind.clone()
    }
  }

  /// Value stored in the `parameters` column.
  pub fn params(&self) -> &str {
    &self.params
  }
}

impl fmt::Display for CacheKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}[{}]", self.identifier(), self.params)
  }
}

/// Trait for cache storage backends.
///
/// Timestamps are epoch seconds. A row whose expiry is at or before `now`
/// must never be returned.
pub trait CacheStorage: Send + Sync {
  /// Look up a live row. May purge expired rows as a side effect.
  fn get(&self, key: &CacheKey, now: i64) -> Result<Option<Vec<u8>>>;

  /// Insert or replace a row.
  fn put(&self, key: &CacheKey, data: &[u8], expires: i64) -> Result<()>;

  /// Delete a single row, if present.
  fn remove(&self, key: &CacheKey) -> Result<()>;

  /// Delete every expired row, returning how many were removed.
  fn purge_expired(&self, now: i64) -> Result<usize>;

  /// Delete every row.
  fn delete_all(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_identifier_variants() {
    let complete = CacheKey::new("Repo", "repo=x,user=alice");
    let partial = CacheKey::partial("Repo", "repo=x,user=alice");

    assert_eq!(complete.identifier(), "Repo");
    assert_eq!(partial.identifier(), "Repo_partial");
    assert_eq!(partial.kind(), "Repo");
    assert_ne!(complete, partial);
  }
}
