use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Error, Result};
use crate::transport::GITHUB_API_BASE;

/// File name looked up in the working directory and its ancestors.
pub const LOCAL_CONFIG: &str = ".ghtree.yaml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub github: GithubConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  /// 0 = info, 1 = debug, 2 = trace with request/response dumps
  #[serde(default)]
  pub debug: u8,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GithubConfig {
  pub user: Option<String>,
  /// Prefer GHTREE_TOKEN / GITHUB_TOKEN over storing it here
  pub token: Option<String>,
  /// API base, for GitHub Enterprise (defaults to api.github.com)
  pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Defaults to `<cache dir>/ghtree/cache.db`
  pub path: Option<PathBuf>,
  /// Seconds to keep rows of a kind, e.g. `Repo: 3600`
  #[serde(default)]
  pub ttl: HashMap<String, i64>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      path: None,
      ttl: HashMap::new(),
    }
  }
}

fn default_true() -> bool {
  true
}

impl Config {
  /// Load configuration from file(s).
  ///
  /// Search order:
  /// 1. Explicit path if provided (used alone)
  /// 2. `.ghtree.yaml` in the current directory and every parent up to home
  /// 3. $XDG_CONFIG_HOME/ghtree/config.yaml
  ///
  /// All files found are merged, the most specific one winning per key.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    if let Some(p) = explicit_path {
      if !p.exists() {
        return Err(Error::Config(format!(
          "Config file not found: {}",
          p.display()
        )));
      }
      return Self::load_from_path(p);
    }

    let cwd = std::env::current_dir()?;
    let home = dirs::home_dir();
    let config_dir = dirs::config_dir();
    let files = Self::find_config_files(&cwd, home.as_deref(), config_dir.as_deref());

    if files.is_empty() {
      return Err(Error::Config(
        "No configuration file found. Create one at ~/.config/ghtree/config.yaml\n\
         See config.example.yaml for the format."
          .to_string(),
      ));
    }

    Self::load_layered(&files)
  }

  /// Existing config files, most specific first.
  fn find_config_files(cwd: &Path, home: Option<&Path>, config_dir: Option<&Path>) -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    for dir in cwd.ancestors() {
      candidates.push(dir.join(LOCAL_CONFIG));
      if Some(dir) == home {
        break;
      }
    }
    if let Some(home) = home {
      if !cwd.starts_with(home) {
        candidates.push(home.join(LOCAL_CONFIG));
      }
    }
    if let Some(config_dir) = config_dir {
      candidates.push(config_dir.join("ghtree").join("config.yaml"));
    }

    candidates.into_iter().filter(|p| p.is_file()).collect()
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    Self::load_layered(&[path.to_path_buf()])
  }

  /// Merge `files` (most specific first) into one configuration.
  fn load_layered(files: &[PathBuf]) -> Result<Self> {
    let mut merged = Value::Mapping(Mapping::new());

    for path in files.iter().rev() {
      let contents = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!(
          "Failed to read config file {}: {}",
          path.display(),
          e
        ))
      })?;

      let layer: Value = serde_yaml::from_str(&contents).map_err(|e| {
        Error::Config(format!(
          "Failed to parse config file {}: {}",
          path.display(),
          e
        ))
      })?;

      debug!("Loaded config layer {}", path.display());
      merge(&mut merged, layer);
    }

    serde_yaml::from_value(merged)
      .map_err(|e| Error::Config(format!("Invalid configuration: {}", e)))
  }

  pub fn user(&self) -> Result<&str> {
    self
      .github
      .user
      .as_deref()
      .ok_or_else(|| Error::Config("github.user is not set".to_string()))
  }

  pub fn api_url(&self) -> &str {
    self.github.url.as_deref().unwrap_or(GITHUB_API_BASE)
  }

  /// Get the GitHub API token.
  ///
  /// Checks GHTREE_TOKEN first, then GITHUB_TOKEN, then `github.token`.
  pub fn api_token(&self) -> Result<String> {
    self.resolve_token(|name| std::env::var(name).ok())
  }

  fn resolve_token(&self, env: impl Fn(&str) -> Option<String>) -> Result<String> {
    env("GHTREE_TOKEN")
      .or_else(|| env("GITHUB_TOKEN"))
      .or_else(|| self.github.token.clone())
      .filter(|token| !token.is_empty())
      .ok_or_else(|| {
        Error::Config(
          "GitHub token not found. Set GHTREE_TOKEN or GITHUB_TOKEN, or github.token in the config file."
            .to_string(),
        )
      })
  }

  /// Directory the log file is written to.
  pub fn log_dir(&self) -> Option<PathBuf> {
    match &self.cache.path {
      Some(path) => path.parent().map(Path::to_path_buf),
      None => dirs::cache_dir().map(|dir| dir.join("ghtree")),
    }
  }
}

/// Deep-merge `overlay` into `base`; mappings merge per key, anything else
/// is replaced.
fn merge(base: &mut Value, overlay: Value) {
  match (base, overlay) {
    (Value::Mapping(base), Value::Mapping(overlay)) => {
      for (key, value) in overlay {
        match base.get_mut(&key) {
          Some(existing) => merge(existing, value),
          None => {
            base.insert(key, value);
          }
        }
      }
    }
    (_, Value::Null) => {}
    (base, overlay) => *base = overlay,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::fs;

  fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
  }

  #[test]
  fn test_defaults() {
    let config: Config = serde_yaml::from_str("github:\n  user: alice\n").unwrap();

    assert_eq!(config.user().unwrap(), "alice");
    assert_eq!(config.api_url(), GITHUB_API_BASE);
    assert!(config.cache.enabled);
    assert!(config.cache.ttl.is_empty());
    assert_eq!(config.debug, 0);
  }

  #[test]
  fn test_missing_user() {
    let config = Config::default();

    assert!(matches!(config.user(), Err(Error::Config(_))));
  }

  #[test]
  fn test_most_specific_layer_wins() {
    let dir = tempfile::tempdir().unwrap();
    let home = dir.path().join("home");
    let project = home.join("src").join("project");
    let xdg = dir.path().join("xdg");

    write(
      &xdg.join("ghtree").join("config.yaml"),
      "github:\n  user: alice\n  url: https://ghe.example.com/api/v3\ncache:\n  ttl:\n    Repo: 60\n",
    );
    write(&home.join(LOCAL_CONFIG), "debug: 1\ncache:\n  ttl:\n    Issue: 30\n");
    write(
      &project.join(LOCAL_CONFIG),
      "github:\n  user: bob\ncache:\n  ttl:\n    Repo: 5\n",
    );

    let files = Config::find_config_files(&project, Some(home.as_path()), Some(xdg.as_path()));
    assert_eq!(files.len(), 3);

    let config = Config::load_layered(&files).unwrap();
    assert_eq!(config.user().unwrap(), "bob");
    assert_eq!(config.api_url(), "https://ghe.example.com/api/v3");
    assert_eq!(config.debug, 1);
    assert_eq!(config.cache.ttl.get("Repo"), Some(&5));
    assert_eq!(config.cache.ttl.get("Issue"), Some(&30));
  }

  #[test]
  fn test_search_stops_at_home() {
    let dir = tempfile::tempdir().unwrap();
    let home = dir.path().join("home");
    write(&dir.path().join(LOCAL_CONFIG), "debug: 2\n");
    write(&home.join(LOCAL_CONFIG), "debug: 1\n");

    let files = Config::find_config_files(&home, Some(home.as_path()), None);

    assert_eq!(files, vec![home.join(LOCAL_CONFIG)]);
  }

  #[test]
  fn test_explicit_path_must_exist() {
    let dir = tempfile::tempdir().unwrap();

    assert!(matches!(
      Config::load(Some(dir.path().join("missing.yaml").as_path())),
      Err(Error::Config(_))
    ));
  }

  #[test]
  fn test_invalid_yaml_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    write(&path, "github: [unterminated\n");

    assert!(matches!(Config::load(Some(path.as_path())), Err(Error::Config(_))));
  }

  #[test]
  fn test_token_precedence() {
    let mut config = Config::default();
    config.github.token = Some("from-file".to_string());

    let both = |name: &str| match name {
      "GHTREE_TOKEN" => Some("ghtree".to_string()),
      "GITHUB_TOKEN" => Some("github".to_string()),
      _ => None,
    };
    let github_only = |name: &str| (name == "GITHUB_TOKEN").then(|| "github".to_string());

    assert_eq!(config.resolve_token(both).unwrap(), "ghtree");
    assert_eq!(config.resolve_token(github_only).unwrap(), "github");
    assert_eq!(config.resolve_token(|_| None).unwrap(), "from-file");

    config.github.token = None;
    assert!(matches!(
      config.resolve_token(|_| None),
      Err(Error::Config(_))
    ));
  }
}
