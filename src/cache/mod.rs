//! Persistent TTL cache for node state.
//!
//! Rows are keyed by (kind identifier, canonical parameters) and hold the
//! JSON-encoded fields of a resource or the key list of a collection:
//! - Expired rows are never returned and are purged opportunistically
//! - Writes replace on the composite key, last write wins
//! - A no-op backend is available when caching is disabled

mod layer;
mod storage;
mod traits;

pub use layer::{CacheLayer, DEFAULT_TTL_SECS};
pub use storage::{NoopStorage, SqliteStorage};
pub use traits::{CacheKey, CacheStorage, PARTIAL_SUFFIX};
