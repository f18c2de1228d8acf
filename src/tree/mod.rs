//! Lazy, cache-coherent tree of remote resources.
//!
//! The tree starts at [`Root`] and is descended one child or member at a
//! time. Every node consults the cache before it goes to the network and
//! writes back what it learns.

mod collection;
mod listing;
mod node;
mod params;
mod registry;
mod resource;
mod session;

#[cfg(test)]
pub(crate) mod fixtures;

pub use collection::{Collection, KeyEntry, KeyState};
pub use listing::{Keys, Members};
pub use node::{Node, Root};
pub use params::Params;
pub use registry::{
  AddProtocol, AddSpec, Capabilities, CollectionKind, ListSpec, NodeKind, Registry, ResourceKind,
  SplitSpec, UrlResolver, UrlSource, ROOT,
};
pub use resource::{Fields, Identity, Resource};
pub use session::Session;

#[cfg(test)]
mod tests {
  use super::fixtures::session_with;
  use super::*;
  use crate::error::Error;
  use crate::transport::mock::MockTransport;
  use crate::transport::Method;
  use serde_json::json;
  use std::sync::Arc;

  #[test]
  fn test_fixture_registry_is_consistent() {
    assert!(fixtures::registry().validate().is_ok());
  }

  #[test]
  fn test_navigate_through_collections_and_resources() {
    let mock = Arc::new(MockTransport::new());
    mock.on_get("/repos/alice/x", json!({"name": "x"}));
    mock.on_get("/repos/alice/x/issues/3", json!({"number": 3, "title": "bug"}));
    let session = session_with(&mock);

    let node = session.navigate("repos/alice/x/issues/3").unwrap();
    let mut issue = node.into_resource().unwrap();

    assert_eq!(issue.kind(), "Issue");
    assert_eq!(issue.get("title").unwrap(), &json!("bug"));
    assert_eq!(issue.params().get("number"), Some("3"));
    assert_eq!(issue.params().get("user"), Some("alice"));
  }

  #[test]
  fn test_navigate_empty_path_is_root() {
    let mock = Arc::new(MockTransport::new());
    let session = session_with(&mock);

    let node = session.navigate("").unwrap();

    assert_eq!(node.kind(), ROOT);
    assert_eq!(node.to_string(), "<Root []>");
  }

  #[test]
  fn test_navigate_unknown_child() {
    let mock = Arc::new(MockTransport::new());
    let session = session_with(&mock);

    assert!(matches!(
      session.navigate("gists"),
      Err(Error::UnknownChild { .. })
    ));
  }

  #[test]
  fn test_root_children_and_document() {
    let mock = Arc::new(MockTransport::new());
    mock.on_get(
      "/",
      json!({"current_user_url": "https://api.github.com/user"}),
    );
    let session = session_with(&mock);
    let root = session.root();

    assert_eq!(root.children(), vec!["orgs", "repos", "users"]);
    assert_eq!(
      root.get("current_user_url").unwrap(),
      json!("https://api.github.com/user")
    );
    assert!(matches!(
      root.get("nope"),
      Err(Error::FieldNotFound { .. })
    ));
    assert_eq!(mock.count(Method::Get, "/"), 2);
  }

  #[test]
  fn test_into_resource_on_collection_is_unsupported() {
    let mock = Arc::new(MockTransport::new());
    let session = session_with(&mock);

    let node = session.navigate("repos/alice").unwrap();

    assert_eq!(node.to_string(), "<Repos [user=alice]>");
    assert!(matches!(
      node.into_resource(),
      Err(Error::Unsupported { .. })
    ));
  }
}
