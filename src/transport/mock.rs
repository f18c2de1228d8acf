//! Scripted transport for unit tests.

use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;

use super::{Method, Response, Transport};
use crate::error::Result;

/// One recorded call.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
  pub method: Method,
  pub target: String,
  pub body: Option<Value>,
}

/// Routes are keyed by method and target (`path` or `path?k=v&k=v`).
/// Unknown routes answer `404 Not Found`.
#[derive(Default)]
pub struct MockTransport {
  routes: Mutex<HashMap<(Method, String), Response>>,
  calls: Mutex<Vec<Call>>,
}

impl MockTransport {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn on(&self, method: Method, target: &str, response: Response) -> &Self {
    self
      .routes
      .lock()
      .unwrap()
      .insert((method, target.to_string()), response);
    self
  }

  pub fn on_get(&self, target: &str, body: Value) -> &Self {
    self.on(Method::Get, target, Response::new(200, body))
  }

  pub fn calls(&self) -> Vec<Call> {
    self.calls.lock().unwrap().clone()
  }

  pub fn count(&self, method: Method, target: &str) -> usize {
    self
      .calls
      .lock()
      .unwrap()
      .iter()
      .filter(|c| c.method == method && c.target == target)
      .count()
  }

  pub fn reset_calls(&self) {
    self.calls.lock().unwrap().clear();
  }
}

pub fn target(path: &str, query: &[(String, String)]) -> String {
  if query.is_empty() {
    return path.to_string();
  }
  let query: Vec<String> = query.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
  format!("{}?{}", path, query.join("&"))
}

impl Transport for MockTransport {
  fn call(
    &self,
    method: Method,
    path: &str,
    body: Option<&Value>,
    query: &[(String, String)],
  ) -> Result<Response> {
    let target = target(path, query);
    self.calls.lock().unwrap().push(Call {
      method,
      target: target.clone(),
      body: body.cloned(),
    });

    Ok(
      self
        .routes
        .lock()
        .unwrap()
        .get(&(method, target))
        .cloned()
        .unwrap_or_else(|| Response::new(404, json!({"message": "Not Found"}))),
    )
  }
}
