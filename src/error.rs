//! Error type shared by the cache, the transport and the resource tree.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
  #[error("{kind} {key} does not exist")]
  NotFound { kind: String, key: String },

  #[error("{node} has no field `{field}`")]
  FieldNotFound { node: String, field: String },

  #[error("Missing required argument(s) for {kind}: {}", missing.join(", "))]
  MissingArgument { kind: String, missing: Vec<String> },

  #[error("Couldn't create {kind} object: {message}")]
  CreateRejected {
    kind: String,
    status: u16,
    message: String,
  },

  #[error("Couldn't update {kind} object: {message}")]
  UpdateRejected {
    kind: String,
    status: u16,
    message: String,
  },

  #[error("Couldn't delete {kind} object: {message}")]
  DeleteRejected {
    kind: String,
    status: u16,
    message: String,
  },

  #[error("Couldn't fetch {kind} object: {message}")]
  FetchFailed {
    kind: String,
    status: u16,
    message: String,
  },

  #[error("Listing {path} failed: {message}")]
  PageCrawlFailed {
    path: String,
    status: u16,
    message: String,
  },

  #[error("{kind} does not support {operation}")]
  Unsupported {
    kind: String,
    operation: &'static str,
  },

  #[error("{kind} has no child named `{name}`")]
  UnknownChild { kind: String, name: String },

  #[error("Unknown node kind `{0}`")]
  UnknownKind(String),

  #[error("URL template {template} needs parameter `{param}`")]
  MissingParameter { template: String, param: String },

  #[error("{kind} listing returned an item without a usable `{field}`")]
  MalformedKey { kind: String, field: String },

  #[error("Request failed: {0}")]
  Transport(String),

  #[error("Cache storage error: {0}")]
  Storage(String),

  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("Configuration error: {0}")]
  Config(String),

  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),
}

impl Error {
  /// True for both a missing remote object and a missing field.
  pub fn is_not_found(&self) -> bool {
    matches!(self, Error::NotFound { .. } | Error::FieldNotFound { .. })
  }
}

impl From<reqwest::Error> for Error {
  fn from(e: reqwest::Error) -> Self {
    Error::Transport(e.to_string())
  }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_missing_argument_lists_fields() {
    let err = Error::MissingArgument {
      kind: "RepoIssues".to_string(),
      missing: vec!["title".to_string(), "body".to_string()],
    };
    assert_eq!(
      err.to_string(),
      "Missing required argument(s) for RepoIssues: title, body"
    );
  }

  #[test]
  fn test_is_not_found() {
    let missing = Error::NotFound {
      kind: "Repo".to_string(),
      key: "x".to_string(),
    };
    let field = Error::FieldNotFound {
      node: "<Repo [repo=x]>".to_string(),
      field: "topics".to_string(),
    };
    assert!(missing.is_not_found());
    assert!(field.is_not_found());
    assert!(!Error::Config("nope".to_string()).is_not_found());
  }
}
