//! Sets of members addressed by a scalar key.
//!
//! A collection caches the keys of its members (not their data, members
//! cache themselves) once a full unfiltered listing has run. That key cache
//! is then amended by confirmed `add`/`delete` calls but never created by
//! them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::{debug, info};

use super::listing::{Items, Keys, Listing, Members};
use super::node::Node;
use super::params::Params;
use super::registry::{AddProtocol, CollectionKind, ListSpec, NodeKind};
use super::resource::{Fields, Identity};
use super::session::Session;
use crate::cache::CacheKey;
use crate::error::{Error, Result};
use crate::pagination::{count_items, PageCrawler};
use crate::transport::{Method, Response, STATUS_CREATED, STATUS_NOT_FOUND};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyState {
  /// Only the key is known
  Listed,
  /// Inline data was cached as the member's partial row
  Partial,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEntry {
  pub key: String,
  pub state: KeyState,
}

pub struct Collection<'s> {
  session: &'s Session,
  kind: &'s CollectionKind,
  params: Params,
  keys: Option<Vec<KeyEntry>>,
}

impl<'s> Collection<'s> {
  pub(crate) fn open(session: &'s Session, kind: &'s CollectionKind, params: Params) -> Self {
    let keys = session
      .cache()
      .load(&CacheKey::new(kind.name, params.canonical()));

    Self {
      session,
      kind,
      params,
      keys,
    }
  }

  pub fn kind(&self) -> &'static str {
    self.kind.name
  }

  pub fn params(&self) -> &Params {
    &self.params
  }

  /// Keys known from a previous complete listing, if any.
  pub fn cached_keys(&self) -> Option<&[KeyEntry]> {
    self.keys.as_deref()
  }

  /// Lazily list member keys, from the key cache when it holds any.
  pub fn list_keys(&mut self) -> Result<Keys<'_, 's>> {
    if let Some(keys) = self.trusted_keys() {
      debug!("{} served from key cache", self);
      return Ok(Keys(Listing::cached(self, keys)));
    }

    let items = self.crawl(&[])?;
    Ok(Keys(Listing::remote(self, items, true, KeyState::Listed)))
  }

  pub fn keys(&mut self) -> Result<Vec<String>> {
    self.list_keys()?.collect()
  }

  /// Lazily list members with their nodes.
  ///
  /// Filtered searches go straight to the server and leave the key cache
  /// alone. Unfiltered searches behave like [`Collection::list_keys`] but
  /// build each member from its inline data.
  pub fn search(&mut self, filters: &[(String, String)]) -> Result<Members<'_, 's>> {
    if !filters.is_empty() {
      let items = self.crawl(filters)?;
      return Ok(Members(Listing::remote(
        self,
        items,
        false,
        KeyState::Partial,
      )));
    }

    if let Some(keys) = self.trusted_keys() {
      return Ok(Members(Listing::cached(self, keys)));
    }

    let items = self.crawl(&[])?;
    Ok(Members(Listing::remote(self, items, true, KeyState::Partial)))
  }

  /// Member addressed by `key`.
  pub fn get(&self, key: &str) -> Result<Node<'s>> {
    self.member(key, None).map_err(|e| match e {
      Error::FetchFailed {
        status: STATUS_NOT_FOUND,
        ..
      } => Error::NotFound {
        kind: self.kind.name.to_string(),
        key: key.to_string(),
      },
      other => other,
    })
  }

  /// Create a member. Returns it when the server answers with its
  /// representation.
  pub fn add(&mut self, fields: Fields) -> Result<Option<Node<'s>>> {
    let kind = self.kind;
    let add = kind
      .capabilities
      .add
      .as_ref()
      .ok_or_else(|| self.unsupported("add"))?;

    let missing: Vec<String> = add
      .required
      .iter()
      .filter(|field| !fields.contains_key(**field))
      .map(|field| field.to_string())
      .collect();
    if !missing.is_empty() {
      return Err(Error::MissingArgument {
        kind: kind.name.to_string(),
        missing,
      });
    }

    match add.protocol {
      AddProtocol::Post => {
        let url = add.url.resolve(self.session, &self.params)?;
        let body = Value::Object(fields);
        let response = self
          .session
          .transport()
          .call(Method::Post, &url, Some(&body), &[])?;
        if response.status != STATUS_CREATED {
          return Err(self.create_rejected(&response));
        }

        let key = self.key_of(&response.body)?;
        let created = response.body.as_object().cloned().unwrap_or_default();

        self.remember(&key, KeyState::Partial);
        info!("created {} in {}", key, self);
        self.member(&key, Some(created)).map(Some)
      }
      AddProtocol::Put => {
        let field = self.key_field()?;
        let key = fields
          .get(field)
          .and_then(scalar)
          .ok_or_else(|| Error::MissingArgument {
            kind: kind.name.to_string(),
            missing: vec![field.to_string()],
          })?;

        let params = self.params.with(kind.member_param, key.as_str());
        let url = add.url.resolve(self.session, &params)?;
        let body = Value::Object(fields);
        let response = self
          .session
          .transport()
          .call(Method::Put, &url, Some(&body), &[])?;
        if !response.is_success() {
          return Err(self.create_rejected(&response));
        }

        self.remember(&key, KeyState::Listed);
        info!("added {} to {}", key, self);
        Ok(None)
      }
    }
  }

  /// Delete the member addressed by `key` and drop what is cached of it.
  pub fn delete(&mut self, key: &str) -> Result<()> {
    let url = self
      .kind
      .capabilities
      .delete
      .ok_or_else(|| self.unsupported("delete"))?;

    let params = self.params.with(self.kind.member_param, key);
    let path = url.resolve(self.session, &params)?;
    let response = self
      .session
      .transport()
      .call(Method::Delete, &path, None, &[])?;
    if !response.is_success() {
      return Err(Error::DeleteRejected {
        kind: self.kind.name.to_string(),
        status: response.status,
        message: response.message(),
      });
    }

    self.forget(key);
    self.evict_member(&params);
    info!("deleted {} from {}", key, self);
    Ok(())
  }

  /// Number of members according to the server, without crawling.
  pub fn remote_len(&self) -> Result<usize> {
    let list = self.list_spec()?;
    let path = list.url.resolve(self.session, &self.params)?;
    let transport = self.session.transport();

    match &list.split {
      Some(split) => split.values.iter().try_fold(0, |total, value| -> Result<usize> {
        let query = [(split.param.to_string(), value.to_string())];
        Ok(total + count_items(transport, &path, &query)?)
      }),
      None => count_items(transport, &path, &[]),
    }
  }

  /// Forget the key cache, locally and in storage.
  pub fn invalidate(&mut self) {
    self.keys = None;
    self.session.cache().evict(&self.key_cache_key());
  }

  /// Build a member node; `data` makes it a partial resource.
  pub(super) fn member(&self, key: &str, data: Option<Fields>) -> Result<Node<'s>> {
    let params = self.params.with(self.kind.member_param, key);
    Node::build(self.session, self.kind.member, params, data, self.identity())
  }

  /// Key of a listed (or created) member object.
  pub(super) fn key_of(&self, item: &Value) -> Result<String> {
    let field = self.key_field()?;
    item
      .get(field)
      .and_then(scalar)
      .ok_or_else(|| Error::MalformedKey {
        kind: self.kind.name.to_string(),
        field: field.to_string(),
      })
  }

  /// Adopt the keys of a complete listing as the key cache.
  pub(super) fn store_keys(&mut self, keys: Vec<KeyEntry>) {
    debug!("{} caching {} key(s)", self, keys.len());
    self.session.cache().store(&self.key_cache_key(), &keys);
    self.keys = Some(keys);
  }

  fn trusted_keys(&self) -> Option<Vec<KeyEntry>> {
    self.keys.as_ref().filter(|keys| !keys.is_empty()).cloned()
  }

  fn crawl(&self, filters: &[(String, String)]) -> Result<Items<'s>> {
    let session: &'s Session = self.session;
    let list = self.list_spec()?;
    let path = list.url.resolve(session, &self.params)?;
    let query = filters.to_vec();
    debug!("{} crawling {} {:?}", self, path, filters);

    match &list.split {
      Some(split) if !filters.iter().any(|(k, _)| k == split.param) => {
        let param = split.param;
        let crawlers = split.values.iter().map(move |value| {
          let mut query = query.clone();
          query.push((param.to_string(), value.to_string()));
          PageCrawler::new(session.transport(), path.clone()).with_query(query)
        });
        Ok(Box::new(crawlers.flatten()))
      }
      _ => Ok(Box::new(
        PageCrawler::new(session.transport(), path).with_query(query),
      )),
    }
  }

  fn list_spec(&self) -> Result<&'s ListSpec> {
    let kind: &'s CollectionKind = self.kind;
    kind
      .capabilities
      .list
      .as_ref()
      .ok_or_else(|| self.unsupported("list"))
  }

  fn key_field(&self) -> Result<&'static str> {
    self
      .kind
      .key_field
      .ok_or_else(|| Error::Config(format!("{} has no key field", self.kind.name)))
  }

  fn identity(&self) -> Option<Identity> {
    self.kind.key_field.map(|field| Identity {
      field,
      param: self.kind.member_param,
    })
  }

  fn key_cache_key(&self) -> CacheKey {
    CacheKey::new(self.kind.name, self.params.canonical())
  }

  fn remember(&mut self, key: &str, state: KeyState) {
    let Some(keys) = self.keys.as_mut() else {
      return;
    };
    if !keys.iter().any(|entry| entry.key == key) {
      keys.push(KeyEntry {
        key: key.to_string(),
        state,
      });
    }
    self.persist_keys();
  }

  fn forget(&mut self, key: &str) {
    let Some(keys) = self.keys.as_mut() else {
      return;
    };
    keys.retain(|entry| entry.key != key);
    self.persist_keys();
  }

  fn persist_keys(&self) {
    if let Some(keys) = &self.keys {
      self.session.cache().store(&self.key_cache_key(), keys);
    }
  }

  fn evict_member(&self, params: &Params) {
    let cache = self.session.cache();
    let canonical = params.canonical();
    match self.kind.member {
      NodeKind::Resource(name) => {
        cache.evict(&CacheKey::new(name, canonical.as_str()));
        cache.evict(&CacheKey::partial(name, canonical.as_str()));
      }
      NodeKind::Collection(name) => cache.evict(&CacheKey::new(name, canonical)),
    }
  }

  fn unsupported(&self, operation: &'static str) -> Error {
    Error::Unsupported {
      kind: self.kind.name.to_string(),
      operation,
    }
  }

  fn create_rejected(&self, response: &Response) -> Error {
    Error::CreateRejected {
      kind: self.kind.name.to_string(),
      status: response.status,
      message: response.message(),
    }
  }
}

/// Keys are strings or numbers (issue numbers).
fn scalar(value: &Value) -> Option<String> {
  match value {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    _ => None,
  }
}

impl fmt::Display for Collection<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "<{} [{}]>", self.kind.name, self.params)
  }
}
