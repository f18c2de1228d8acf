//! Browse the GitHub REST API as a lazily loaded tree of resources and
//! collections, backed by a persistent TTL cache.
//!
//! ```no_run
//! use ghtree::config::Config;
//!
//! let config = Config::load(None)?;
//! let session = ghtree::github::connect(&config)?;
//! let mut repo = session.navigate("repos/rust-lang/rust")?.into_resource()?;
//! println!("{}", repo.get("description")?);
//! # Ok::<(), ghtree::Error>(())
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod github;
pub mod logging;
pub mod pagination;
pub mod transport;
pub mod tree;

pub use error::{Error, Result};
