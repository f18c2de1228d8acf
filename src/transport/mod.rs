//! Transport seam between the resource tree and the remote API.
//!
//! The tree only needs `call(method, path, body, query)` returning a status,
//! lower-cased headers and a decoded JSON body. [`HttpTransport`] talks to
//! GitHub over HTTPS; tests script responses with a mock.

mod http;
#[cfg(test)]
pub(crate) mod mock;

pub use http::{HttpTransport, GITHUB_API_BASE};

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
  Get,
  Post,
  Patch,
  Put,
  Delete,
}

impl Method {
  pub fn as_str(&self) -> &'static str {
    match self {
      Method::Get => "GET",
      Method::Post => "POST",
      Method::Patch => "PATCH",
      Method::Put => "PUT",
      Method::Delete => "DELETE",
    }
  }
}

impl fmt::Display for Method {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

pub const STATUS_CREATED: u16 = 201;
pub const STATUS_NOT_FOUND: u16 = 404;

/// A decoded API response.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
  pub status: u16,
  /// Header names are lower-cased
  pub headers: BTreeMap<String, String>,
  /// `null` for empty bodies
  pub body: Value,
}

impl Response {
  pub fn new(status: u16, body: Value) -> Self {
    Self {
      status,
      headers: BTreeMap::new(),
      body,
    }
  }

  pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
    self.headers.insert(name.to_ascii_lowercase(), value.into());
    self
  }

  pub fn header(&self, name: &str) -> Option<&str> {
    self
      .headers
      .get(&name.to_ascii_lowercase())
      .map(String::as_str)
  }

  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }

  /// Human readable failure message, taken from the body when the server
  /// provided one.
  pub fn message(&self) -> String {
    self
      .body
      .get("message")
      .and_then(Value::as_str)
      .map(String::from)
      .unwrap_or_else(|| format!("HTTP {}", self.status))
  }

  /// Target of the `Link` header entry with the given relation.
  pub fn link(&self, rel: &str) -> Option<String> {
    self.header("link").and_then(|h| parse_link(h, rel))
  }
}

/// Find the URL for `rel` in an RFC 8288 `Link` header value, e.g.
/// `<https://api.github.com/user/repos?page=2>; rel="next"`.
pub fn parse_link(header: &str, rel: &str) -> Option<String> {
  header.split(',').find_map(|entry| {
    let mut parts = entry.split(';');
    let target = parts.next()?.trim();
    let target = target.strip_prefix('<')?.strip_suffix('>')?;

    let matches = parts.any(|param| {
      let param = param.trim();
      param
        .strip_prefix("rel=")
        .map(|value| value.trim_matches('"').split_whitespace().any(|r| r == rel))
        .unwrap_or(false)
    });

    matches.then(|| target.to_string())
  })
}

/// Something that can perform API calls.
///
/// `path` is either relative to the API base (`/users/octocat`) or an
/// absolute URL taken from a `Link` header. Only transport-level failures
/// are errors; HTTP error statuses come back as a [`Response`].
pub trait Transport {
  fn call(
    &self,
    method: Method,
    path: &str,
    body: Option<&Value>,
    query: &[(String, String)],
  ) -> Result<Response>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
  fn call(
    &self,
    method: Method,
    path: &str,
    body: Option<&Value>,
    query: &[(String, String)],
  ) -> Result<Response> {
    (**self).call(method, path, body, query)
  }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
  fn call(
    &self,
    method: Method,
    path: &str,
    body: Option<&Value>,
    query: &[(String, String)],
  ) -> Result<Response> {
    (**self).call(method, path, body, query)
  }
}
