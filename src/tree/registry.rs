//! Node kinds and the registry that wires them into a tree.
//!
//! Kinds are plain descriptors: a resource kind knows where it lives, a
//! collection kind knows its member kind and which of list/add/delete it
//! supports. The registry maps `(parent kind, child name)` to the kind a
//! child is built from. It is filled once and then only read.

use std::collections::HashMap;
use std::fmt;

use super::params::Params;
use super::session::Session;
use crate::error::{Error, Result};

/// Kind name of the tree root.
pub const ROOT: &str = "Root";

/// Builds a URL from the session state and the node parameters.
pub type UrlResolver = fn(&Session, &Params) -> Result<String>;

/// Where a node's endpoint lives.
#[derive(Clone, Copy)]
pub enum UrlSource {
  /// `/repos/{user}/{repo}`, filled from the node parameters
  Template(&'static str),
  /// Computed, for endpoints that depend on who is authenticated
  Resolver(UrlResolver),
}

impl UrlSource {
  pub fn resolve(&self, session: &Session, params: &Params) -> Result<String> {
    match self {
      UrlSource::Template(template) => params.render(template),
      UrlSource::Resolver(resolve) => resolve(session, params),
    }
  }
}

impl fmt::Debug for UrlSource {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      UrlSource::Template(template) => f.debug_tuple("Template").field(template).finish(),
      UrlSource::Resolver(_) => f.write_str("Resolver(..)"),
    }
  }
}

/// Reference to a registered kind, used as child constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
  Resource(&'static str),
  Collection(&'static str),
}

/// A single remote object kind.
#[derive(Debug, Clone)]
pub struct ResourceKind {
  pub name: &'static str,
  pub url: UrlSource,
}

impl ResourceKind {
  pub fn new(name: &'static str, url: UrlSource) -> Self {
    Self { name, url }
  }
}

/// Listing is the concatenation of one crawl per value of `param`, unless
/// the caller filters on `param` itself.
#[derive(Debug, Clone)]
pub struct SplitSpec {
  pub param: &'static str,
  pub values: &'static [&'static str],
}

#[derive(Debug, Clone)]
pub struct ListSpec {
  pub url: UrlSource,
  pub split: Option<SplitSpec>,
}

impl ListSpec {
  pub fn new(url: UrlSource) -> Self {
    Self { url, split: None }
  }

  pub fn split_by(mut self, param: &'static str, values: &'static [&'static str]) -> Self {
    self.split = Some(SplitSpec { param, values });
    self
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddProtocol {
  /// Submit to a creation endpoint, answered with `201 Created` and the
  /// new object
  Post,
  /// Address the new member by its key, answered without content
  Put,
}

#[derive(Debug, Clone)]
pub struct AddSpec {
  pub url: UrlSource,
  pub protocol: AddProtocol,
  /// Fields checked before any request is made
  pub required: &'static [&'static str],
}

impl AddSpec {
  pub fn post(url: UrlSource) -> Self {
    Self {
      url,
      protocol: AddProtocol::Post,
      required: &[],
    }
  }

  pub fn put(url: UrlSource) -> Self {
    Self {
      url,
      protocol: AddProtocol::Put,
      required: &[],
    }
  }

  pub fn requiring(mut self, required: &'static [&'static str]) -> Self {
    self.required = required;
    self
  }
}

/// What a collection supports besides `get`. Absent entries are unsupported.
#[derive(Debug, Clone, Default)]
pub struct Capabilities {
  pub list: Option<ListSpec>,
  pub add: Option<AddSpec>,
  pub delete: Option<UrlSource>,
}

/// A set of members addressed by a scalar key.
#[derive(Debug, Clone)]
pub struct CollectionKind {
  pub name: &'static str,
  pub member: NodeKind,
  /// Parameter a member key is bound to, e.g. `repo`
  pub member_param: &'static str,
  /// Field of a member object holding its key, e.g. `name`
  pub key_field: Option<&'static str>,
  pub capabilities: Capabilities,
}

impl CollectionKind {
  pub fn new(name: &'static str, member: NodeKind, member_param: &'static str) -> Self {
    Self {
      name,
      member,
      member_param,
      key_field: None,
      capabilities: Capabilities::default(),
    }
  }

  pub fn keyed_by(mut self, field: &'static str) -> Self {
    self.key_field = Some(field);
    self
  }

  pub fn listable(mut self, list: ListSpec) -> Self {
    self.capabilities.list = Some(list);
    self
  }

  pub fn addable(mut self, add: AddSpec) -> Self {
    self.capabilities.add = Some(add);
    self
  }

  pub fn deletable(mut self, url: UrlSource) -> Self {
    self.capabilities.delete = Some(url);
    self
  }
}

/// The static shape of the tree.
#[derive(Debug, Clone, Default)]
pub struct Registry {
  resources: HashMap<&'static str, ResourceKind>,
  collections: HashMap<&'static str, CollectionKind>,
  children: HashMap<(&'static str, &'static str), NodeKind>,
}

impl Registry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_resource(mut self, kind: ResourceKind) -> Self {
    self.resources.insert(kind.name, kind);
    self
  }

  pub fn with_collection(mut self, kind: CollectionKind) -> Self {
    self.collections.insert(kind.name, kind);
    self
  }

  /// Declare that nodes of kind `parent` expose `kind` under `name`.
  pub fn with_child(mut self, parent: &'static str, name: &'static str, kind: NodeKind) -> Self {
    self.children.insert((parent, name), kind);
    self
  }

  pub fn resource_kind(&self, name: &str) -> Result<&ResourceKind> {
    self
      .resources
      .get(name)
      .ok_or_else(|| Error::UnknownKind(name.to_string()))
  }

  pub fn collection_kind(&self, name: &str) -> Result<&CollectionKind> {
    self
      .collections
      .get(name)
      .ok_or_else(|| Error::UnknownKind(name.to_string()))
  }

  pub fn child(&self, parent: &str, name: &str) -> Option<NodeKind> {
    self
      .children
      .iter()
      .find(|((p, n), _)| *p == parent && *n == name)
      .map(|(_, kind)| *kind)
  }

  /// Child names of a kind, sorted.
  pub fn children(&self, parent: &str) -> Vec<&'static str> {
    let mut names: Vec<&'static str> = self
      .children
      .keys()
      .filter(|(p, _)| *p == parent)
      .map(|(_, n)| *n)
      .collect();
    names.sort_unstable();
    names
  }

  /// Check that every referenced kind is registered and that collections
  /// that list or add know their members' key field.
  pub fn validate(&self) -> Result<()> {
    let exists = |kind: &NodeKind| match kind {
      NodeKind::Resource(name) => self.resource_kind(name).map(|_| ()),
      NodeKind::Collection(name) => self.collection_kind(name).map(|_| ()),
    };

    for ((parent, _), kind) in &self.children {
      if *parent != ROOT && !self.resources.contains_key(parent) {
        return Err(Error::UnknownKind(parent.to_string()));
      }
      exists(kind)?;
    }

    for collection in self.collections.values() {
      exists(&collection.member)?;

      let caps = &collection.capabilities;
      if (caps.list.is_some() || caps.add.is_some()) && collection.key_field.is_none() {
        return Err(Error::Config(format!(
          "{} lists or adds members but has no key field",
          collection.name
        )));
      }
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample() -> Registry {
    Registry::new()
      .with_resource(ResourceKind::new(
        "Repo",
        UrlSource::Template("/repos/{user}/{repo}"),
      ))
      .with_resource(ResourceKind::new(
        "User",
        UrlSource::Template("/users/{user}"),
      ))
      .with_collection(
        CollectionKind::new("UserRepos", NodeKind::Resource("Repo"), "repo")
          .keyed_by("name")
          .listable(ListSpec::new(UrlSource::Template("/users/{user}/repos"))),
      )
      .with_collection(CollectionKind::new(
        "Users",
        NodeKind::Resource("User"),
        "user",
      ))
      .with_child(ROOT, "users", NodeKind::Collection("Users"))
      .with_child("User", "repos", NodeKind::Collection("UserRepos"))
  }

  #[test]
  fn test_child_lookup() {
    let registry = sample();

    assert_eq!(
      registry.child("User", "repos"),
      Some(NodeKind::Collection("UserRepos"))
    );
    assert_eq!(registry.child("Repo", "repos"), None);
    assert_eq!(registry.children(ROOT), vec!["users"]);
  }

  #[test]
  fn test_validate_accepts_consistent_registry() {
    assert!(sample().validate().is_ok());
  }

  #[test]
  fn test_validate_rejects_dangling_kind() {
    let registry = sample().with_child("User", "gists", NodeKind::Collection("Gists"));

    assert!(matches!(registry.validate(), Err(Error::UnknownKind(name)) if name == "Gists"));
  }

  #[test]
  fn test_validate_requires_key_field_for_listing() {
    let registry = sample().with_collection(
      CollectionKind::new("Users", NodeKind::Resource("User"), "user")
        .listable(ListSpec::new(UrlSource::Template("/users"))),
    );

    assert!(matches!(registry.validate(), Err(Error::Config(_))));
  }
}
