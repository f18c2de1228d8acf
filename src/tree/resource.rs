//! Single remote objects.
//!
//! A resource is either partial (fields came inline with a listing) or
//! complete (fields came from a direct fetch). Partial resources complete
//! themselves the first time a missing field is read.

use serde_json::Value;
use std::fmt;
use tracing::{debug, info};

use super::node::Node;
use super::params::Params;
use super::registry::ResourceKind;
use super::session::Session;
use crate::cache::CacheKey;
use crate::error::{Error, Result};
use crate::transport::Method;

/// Field name to JSON value.
pub type Fields = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Completeness {
  Partial,
  Complete,
}

/// Field of the resource that mirrors the key it is addressed by in its
/// collection, and the parameter that key is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
  pub field: &'static str,
  pub param: &'static str,
}

pub struct Resource<'s> {
  session: &'s Session,
  kind: &'s ResourceKind,
  params: Params,
  identity: Option<Identity>,
  fields: Fields,
  completeness: Completeness,
}

impl<'s> Resource<'s> {
  /// Resource built from inline listing data. Persisted as partial.
  pub(crate) fn from_data(
    session: &'s Session,
    kind: &'s ResourceKind,
    params: Params,
    identity: Option<Identity>,
    fields: Fields,
  ) -> Self {
    let resource = Self {
      session,
      kind,
      params,
      identity,
      fields,
      completeness: Completeness::Partial,
    };
    resource.persist();
    resource
  }

  /// Resource read from the cache (complete row first, then partial), or
  /// fetched when neither is live.
  pub(crate) fn load(
    session: &'s Session,
    kind: &'s ResourceKind,
    params: Params,
    identity: Option<Identity>,
  ) -> Result<Self> {
    let canonical = params.canonical();
    let cache = session.cache();

    let (fields, completeness) =
      if let Some(fields) = cache.load::<Fields>(&CacheKey::new(kind.name, canonical.as_str())) {
        (fields, Completeness::Complete)
      } else if let Some(fields) =
        cache.load::<Fields>(&CacheKey::partial(kind.name, canonical.as_str()))
      {
        (fields, Completeness::Partial)
      } else {
        let fields = fetch(session, kind, &params)?;
        cache.store(&CacheKey::new(kind.name, canonical.as_str()), &fields);
        (fields, Completeness::Complete)
      };

    let resource = Self {
      session,
      kind,
      params,
      identity,
      fields,
      completeness,
    };
    debug!("loaded {} ({:?})", resource, completeness);
    Ok(resource)
  }

  pub fn kind(&self) -> &'static str {
    self.kind.name
  }

  pub fn params(&self) -> &Params {
    &self.params
  }

  pub fn is_partial(&self) -> bool {
    self.completeness == Completeness::Partial
  }

  pub fn fields(&self) -> &Fields {
    &self.fields
  }

  /// Read a field, completing a partial resource once if it lacks it.
  pub fn get(&mut self, key: &str) -> Result<&Value> {
    if !self.fields.contains_key(key) && self.is_partial() {
      debug!("{} lacks {}, completing", self, key);
      self.complete()?;
    }

    self.fields.get(key).ok_or_else(|| Error::FieldNotFound {
      node: self.to_string(),
      field: key.to_string(),
    })
  }

  /// Replace the fields with a full fetch.
  pub fn complete(&mut self) -> Result<()> {
    self.fields = fetch(self.session, self.kind, &self.params)?;
    self.completeness = Completeness::Complete;
    self.persist();
    Ok(())
  }

  pub fn set(&mut self, key: &str, value: Value) -> Result<()> {
    let mut fields = Fields::new();
    fields.insert(key.to_string(), value);
    self.update(fields)
  }

  /// PATCH the resource and adopt the server's representation.
  pub fn update(&mut self, mut fields: Fields) -> Result<()> {
    if let Some(identity) = self.identity {
      if !fields.contains_key(identity.field) {
        let current = self.fields.get(identity.field).cloned().or_else(|| {
          self
            .params
            .get(identity.param)
            .map(|v| Value::String(v.to_string()))
        });
        if let Some(value) = current {
          fields.insert(identity.field.to_string(), value);
        }
      }
    }

    let url = self.kind.url.resolve(self.session, &self.params)?;
    let body = Value::Object(fields);
    let response = self
      .session
      .transport()
      .call(Method::Patch, &url, Some(&body), &[])?;

    if !response.is_success() {
      return Err(Error::UpdateRejected {
        kind: self.kind.name.to_string(),
        status: response.status,
        message: response.message(),
      });
    }

    match response.body {
      Value::Object(fields) => {
        self.fields = fields;
        self.completeness = Completeness::Complete;
        self.persist();
      }
      _ => self.complete()?,
    }

    info!("updated {}", self);
    Ok(())
  }

  /// Named child, inheriting this resource's parameters.
  pub fn child(&self, name: &str) -> Result<Node<'s>> {
    let kind = self
      .session
      .registry()
      .child(self.kind.name, name)
      .ok_or_else(|| Error::UnknownChild {
        kind: self.kind.name.to_string(),
        name: name.to_string(),
      })?;

    Node::build(self.session, kind, self.params.clone(), None, None)
  }

  pub fn children(&self) -> Vec<&'static str> {
    self.session.registry().children(self.kind.name)
  }

  fn cache_key(&self) -> CacheKey {
    match self.completeness {
      Completeness::Complete => CacheKey::new(self.kind.name, self.params.canonical()),
      Completeness::Partial => CacheKey::partial(self.kind.name, self.params.canonical()),
    }
  }

  fn persist(&self) {
    self.session.cache().store(&self.cache_key(), &self.fields);
  }
}

/// GET the resource; anything but a 2xx object is a fetch failure.
fn fetch(session: &Session, kind: &ResourceKind, params: &Params) -> Result<Fields> {
  let url = kind.url.resolve(session, params)?;
  debug!("fetching {} from {}", kind.name, url);

  let response = session.transport().call(Method::Get, &url, None, &[])?;
  if !response.is_success() {
    return Err(Error::FetchFailed {
      kind: kind.name.to_string(),
      status: response.status,
      message: response.message(),
    });
  }

  match response.body {
    Value::Object(fields) => Ok(fields),
    _ => Err(Error::FetchFailed {
      kind: kind.name.to_string(),
      status: response.status,
      message: "expected a JSON object".to_string(),
    }),
  }
}

impl fmt::Display for Resource<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "<{} [{}]>", self.kind.name, self.params)
  }
}
