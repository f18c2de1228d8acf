use tracing::debug;

use super::node::{Node, Root};
use super::registry::Registry;
use crate::cache::CacheLayer;
use crate::error::Result;
use crate::transport::Transport;

/// Everything nodes share: the transport, the cache, the tree shape and the
/// authenticated login. Nodes borrow it for their whole life.
pub struct Session {
  transport: Box<dyn Transport>,
  cache: CacheLayer,
  registry: Registry,
  login: Option<String>,
}

impl Session {
  pub fn new(transport: impl Transport + 'static, cache: CacheLayer, registry: Registry) -> Self {
    Self {
      transport: Box::new(transport),
      cache,
      registry,
      login: None,
    }
  }

  /// Record which user the transport authenticates as.
  pub fn with_login(mut self, login: impl Into<String>) -> Self {
    self.login = Some(login.into());
    self
  }

  pub fn login(&self) -> Option<&str> {
    self.login.as_deref()
  }

  pub fn transport(&self) -> &dyn Transport {
    self.transport.as_ref()
  }

  pub fn cache(&self) -> &CacheLayer {
    &self.cache
  }

  pub fn registry(&self) -> &Registry {
    &self.registry
  }

  pub fn root(&self) -> Root<'_> {
    Root::new(self)
  }

  /// Descend from the root along a `/`-separated path.
  ///
  /// On the root and on resources a segment names a child; on collections
  /// it is a member key: `users/alice/repos/ghtree/issues/12`.
  pub fn navigate(&self, path: &str) -> Result<Node<'_>> {
    debug!("navigate {}", path);

    let mut node = Node::Root(self.root());
    for segment in path.split('/').filter(|s| !s.is_empty()) {
      node = node.child(segment)?;
    }
    Ok(node)
  }
}
