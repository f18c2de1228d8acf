use serde_json::Value;
use std::fmt;

use super::collection::Collection;
use super::params::Params;
use super::registry::{NodeKind, ROOT};
use super::resource::{Fields, Identity, Resource};
use super::session::Session;
use crate::error::{Error, Result};
use crate::transport::Method;

/// Any node of the tree.
pub enum Node<'s> {
  Root(Root<'s>),
  Resource(Resource<'s>),
  Collection(Collection<'s>),
}

impl<'s> Node<'s> {
  /// Construct a node of `kind`.
  ///
  /// Resources built with `data` start out partial; without it they come
  /// from the cache or a fetch. Collections ignore `data`.
  pub(crate) fn build(
    session: &'s Session,
    kind: NodeKind,
    params: Params,
    data: Option<Fields>,
    identity: Option<Identity>,
  ) -> Result<Self> {
    match kind {
      NodeKind::Resource(name) => {
        let kind = session.registry().resource_kind(name)?;
        let resource = match data {
          Some(data) => Resource::from_data(session, kind, params, identity, data),
          None => Resource::load(session, kind, params, identity)?,
        };
        Ok(Node::Resource(resource))
      }
      NodeKind::Collection(name) => {
        let kind = session.registry().collection_kind(name)?;
        Ok(Node::Collection(Collection::open(session, kind, params)))
      }
    }
  }

  /// Named child of the root or of a resource, member of a collection.
  pub fn child(&self, name: &str) -> Result<Node<'s>> {
    match self {
      Node::Root(root) => root.child(name),
      Node::Resource(resource) => resource.child(name),
      Node::Collection(collection) => collection.get(name),
    }
  }

  pub fn kind(&self) -> &'static str {
    match self {
      Node::Root(_) => ROOT,
      Node::Resource(resource) => resource.kind(),
      Node::Collection(collection) => collection.kind(),
    }
  }

  pub fn into_resource(self) -> Result<Resource<'s>> {
    match self {
      Node::Resource(resource) => Ok(resource),
      other => Err(Error::Unsupported {
        kind: other.kind().to_string(),
        operation: "field access",
      }),
    }
  }

  pub fn into_collection(self) -> Result<Collection<'s>> {
    match self {
      Node::Collection(collection) => Ok(collection),
      other => Err(Error::Unsupported {
        kind: other.kind().to_string(),
        operation: "membership",
      }),
    }
  }
}

impl fmt::Display for Node<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Node::Root(_) => write!(f, "<{} []>", ROOT),
      Node::Resource(resource) => write!(f, "{}", resource),
      Node::Collection(collection) => write!(f, "{}", collection),
    }
  }
}

/// Entry point of the tree. Has named children and can read the API root
/// document.
pub struct Root<'s> {
  session: &'s Session,
}

impl<'s> Root<'s> {
  pub(crate) fn new(session: &'s Session) -> Self {
    Self { session }
  }

  pub fn child(&self, name: &str) -> Result<Node<'s>> {
    let kind = self
      .session
      .registry()
      .child(ROOT, name)
      .ok_or_else(|| Error::UnknownChild {
        kind: ROOT.to_string(),
        name: name.to_string(),
      })?;

    Node::build(self.session, kind, Params::new(), None, None)
  }

  pub fn children(&self) -> Vec<&'static str> {
    self.session.registry().children(ROOT)
  }

  /// Field of the API root document (`GET /`), e.g. `current_user_url`.
  pub fn get(&self, field: &str) -> Result<Value> {
    let response = self.session.transport().call(Method::Get, "/", None, &[])?;
    if !response.is_success() {
      return Err(Error::FetchFailed {
        kind: ROOT.to_string(),
        status: response.status,
        message: response.message(),
      });
    }

    response
      .body
      .get(field)
      .cloned()
      .ok_or_else(|| Error::FieldNotFound {
        node: ROOT.to_string(),
        field: field.to_string(),
      })
  }
}
