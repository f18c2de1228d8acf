//! Node parameters and URL templates.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Error, Result};

/// Named parameters addressing a node, e.g. `{repo: "x", user: "alice"}`.
///
/// Kept sorted so that the canonical form used as cache key does not depend
/// on the order in which the tree was descended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(BTreeMap<String, String>);

impl Params {
  pub fn new() -> Self {
    Self::default()
  }

  /// Copy of these parameters with one more (or one replaced) entry.
  pub fn with(&self, name: &str, value: impl Into<String>) -> Self {
    let mut next = self.clone();
    next.0.insert(name.to_string(), value.into());
    next
  }

  pub fn get(&self, name: &str) -> Option<&str> {
    self.0.get(name).map(String::as_str)
  }

  /// `k=v,k=v` form stored in the cache `parameters` column.
  pub fn canonical(&self) -> String {
    self
      .0
      .iter()
      .map(|(k, v)| format!("{}={}", k, v))
      .collect::<Vec<_>>()
      .join(",")
  }

  /// Fill the `{name}` placeholders of a URL template.
  pub fn render(&self, template: &str) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
      out.push_str(&rest[..start]);
      let after = &rest[start + 1..];
      let end = after.find('}').ok_or_else(|| missing(template, after))?;
      let name = &after[..end];
      let value = self.get(name).ok_or_else(|| missing(template, name))?;
      out.push_str(value);
      rest = &after[end + 1..];
    }
    out.push_str(rest);

    Ok(out)
  }
}

fn missing(template: &str, param: &str) -> Error {
  Error::MissingParameter {
    template: template.to_string(),
    param: param.to_string(),
  }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    Self(
      iter
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect(),
    )
  }
}

impl fmt::Display for Params {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let pairs: Vec<String> = self.0.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    f.write_str(&pairs.join(" "))
  }
}
