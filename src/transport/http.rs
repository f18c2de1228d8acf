//! GitHub API HTTP transport.
//!
//! Handles authentication, default headers, and request/response decoding.

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::trace;
use url::Url;

use super::{Method, Response, Transport};
use crate::error::{Error, Result};

pub const GITHUB_API_BASE: &str = "https://api.github.com";
const GITHUB_API_VERSION: &str = "2022-11-28";

/// Blocking HTTP transport authenticating with user + personal access token.
pub struct HttpTransport {
  client: Client,
  base: String,
  user: String,
  token: String,
  /// Dump every request and response at trace level
  wire_log: bool,
}

impl HttpTransport {
  /// Create a transport for the given API base URL.
  pub fn new(base: &str, user: &str, token: &str) -> Result<Self> {
    let mut headers = HeaderMap::new();

    headers.insert(
      ACCEPT,
      HeaderValue::from_static("application/vnd.github+json"),
    );
    headers.insert(
      "X-GitHub-Api-Version",
      HeaderValue::from_static(GITHUB_API_VERSION),
    );
    headers.insert(USER_AGENT, HeaderValue::from_static("ghtree"));

    let client = Client::builder().default_headers(headers).build()?;

    Ok(Self {
      client,
      base: base.trim_end_matches('/').to_string(),
      user: user.to_string(),
      token: token.to_string(),
      wire_log: false,
    })
  }

  /// Log full request and response bodies.
  pub fn with_wire_log(mut self, enabled: bool) -> Self {
    self.wire_log = enabled;
    self
  }

  /// Resolve a relative API path or an absolute link target.
  fn url(&self, path: &str) -> Result<Url> {
    let raw = if path.starts_with("http://") || path.starts_with("https://") {
      path.to_string()
    } else {
      format!("{}{}", self.base, path)
    };

    Url::parse(&raw).map_err(|e| Error::Transport(format!("Invalid URL {}: {}", raw, e)))
  }
}

impl Transport for HttpTransport {
  fn call(
    &self,
    method: Method,
    path: &str,
    body: Option<&Value>,
    query: &[(String, String)],
  ) -> Result<Response> {
    let url = self.url(path)?;

    let mut request = match method {
      Method::Get => self.client.get(url),
      Method::Post => self.client.post(url),
      Method::Patch => self.client.patch(url),
      Method::Put => self.client.put(url),
      Method::Delete => self.client.delete(url),
    }
    .basic_auth(&self.user, Some(&self.token));

    if !query.is_empty() {
      request = request.query(query);
    }
    if let Some(body) = body {
      request = request.json(body);
    }

    let response = request.send()?;

    let status = response.status().as_u16();
    let final_url = response.url().to_string();
    let headers: BTreeMap<String, String> = response
      .headers()
      .iter()
      .filter_map(|(name, value)| {
        value
          .to_str()
          .ok()
          .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
      })
      .collect();

    let text = response.text()?;
    let decoded = if text.trim().is_empty() {
      Value::Null
    } else {
      serde_json::from_str(&text).unwrap_or(Value::String(text))
    };

    if self.wire_log {
      trace!(
        ">>> Request\n{} {}\n{}\n>>> Response\n{}\n{}",
        method,
        final_url,
        body.map(pretty).unwrap_or_default(),
        status,
        pretty(&decoded)
      );
    }

    Ok(Response {
      status,
      headers,
      body: decoded,
    })
  }
}

fn pretty(value: &Value) -> String {
  serde_json::to_string_pretty(value).unwrap_or_default()
}
