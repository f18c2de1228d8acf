use clap::{Parser, Subcommand};
use color_eyre::Result;
use serde_json::Value;
use std::path::PathBuf;

use ghtree::config::Config;
use ghtree::tree::{Fields, Node};
use ghtree::{github, logging};

#[derive(Parser, Debug)]
#[command(name = "ghtree")]
#[command(about = "Browse the GitHub API as a cached tree")]
#[command(version)]
struct Args {
  /// Path to config file (default: .ghtree.yaml files and $XDG_CONFIG_HOME/ghtree/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Print a resource as JSON, or the keys of a collection
  Show { path: String },
  /// List the keys of a collection
  Ls {
    path: String,
    /// Only list members matching key=value (sent as query parameter)
    #[arg(short, long = "filter", value_parser = parse_pair)]
    filters: Vec<(String, String)>,
  },
  /// Update fields of a resource
  Set {
    path: String,
    #[arg(required = true, value_parser = parse_pair)]
    fields: Vec<(String, String)>,
  },
  /// Add a member to a collection
  Add {
    path: String,
    #[arg(value_parser = parse_pair)]
    fields: Vec<(String, String)>,
  },
  /// Delete a member of a collection
  Rm { path: String, key: String },
  /// Cache maintenance
  Cache {
    #[command(subcommand)]
    command: CacheCommand,
  },
}

#[derive(Subcommand, Debug)]
enum CacheCommand {
  /// Delete every cached row
  Clear,
  /// Delete expired rows
  Purge,
  /// Forget the cached keys of a collection so the next listing crawls again
  Refresh { path: String },
}

fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let config = Config::load(args.config.as_deref())?;

  let _guard = match config.log_dir() {
    Some(dir) => Some(logging::setup_logging(&dir, config.debug)?),
    None => None,
  };

  let connect = || github::connect(&config);

  match args.command {
    Command::Show { path } => {
      let session = connect()?;
      match session.navigate(&path)? {
        Node::Root(root) => {
          for child in root.children() {
            println!("{}", child);
          }
        }
        Node::Resource(resource) => {
          println!("{}", serde_json::to_string_pretty(resource.fields())?)
        }
        Node::Collection(mut collection) => {
          for key in collection.list_keys()? {
            println!("{}", key?);
          }
        }
      }
    }
    Command::Ls { path, filters } => {
      let session = connect()?;
      let mut collection = session.navigate(&path)?.into_collection()?;
      if filters.is_empty() {
        for key in collection.list_keys()? {
          println!("{}", key?);
        }
      } else {
        for member in collection.search(&filters)? {
          let (key, _) = member?;
          println!("{}", key);
        }
      }
    }
    Command::Set { path, fields } => {
      let session = connect()?;
      let mut resource = session.navigate(&path)?.into_resource()?;
      resource.update(to_fields(fields))?;
      println!("{}", serde_json::to_string_pretty(resource.fields())?);
    }
    Command::Add { path, fields } => {
      let session = connect()?;
      let mut collection = session.navigate(&path)?.into_collection()?;
      match collection.add(to_fields(fields))? {
        Some(Node::Resource(created)) => {
          println!("{}", serde_json::to_string_pretty(created.fields())?)
        }
        Some(other) => println!("{}", other),
        None => println!("added to {}", collection),
      }
    }
    Command::Rm { path, key } => {
      let session = connect()?;
      let mut collection = session.navigate(&path)?.into_collection()?;
      collection.delete(&key)?;
      println!("deleted {} from {}", key, collection);
    }
    Command::Cache { command } => match command {
      CacheCommand::Clear => {
        github::cache_layer(&config.cache)?.clear()?;
        println!("cache cleared");
      }
      CacheCommand::Purge => {
        let purged = github::cache_layer(&config.cache)?.purge_expired()?;
        println!("{} expired row(s) purged", purged);
      }
      CacheCommand::Refresh { path } => {
        let session = connect()?;
        let mut collection = session.navigate(&path)?.into_collection()?;
        collection.invalidate();
        println!("forgot cached keys of {}", collection);
      }
    },
  }

  Ok(())
}

/// `key=value`
fn parse_pair(s: &str) -> std::result::Result<(String, String), String> {
  let (key, value) = s
    .split_once('=')
    .ok_or_else(|| format!("expected key=value, got `{}`", s))?;
  if key.is_empty() {
    return Err(format!("empty key in `{}`", s));
  }
  Ok((key.to_string(), value.to_string()))
}

/// Values that parse as JSON are sent as such (`private=true`, `count=3`),
/// anything else as a string.
fn to_fields(pairs: Vec<(String, String)>) -> Fields {
  pairs
    .into_iter()
    .map(|(key, raw)| {
      let value = serde_json::from_str(&raw).unwrap_or(Value::String(raw));
      (key, value)
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_parse_pair() {
    assert_eq!(
      parse_pair("title=Crash on start").unwrap(),
      ("title".to_string(), "Crash on start".to_string())
    );
    assert_eq!(
      parse_pair("body=a=b").unwrap(),
      ("body".to_string(), "a=b".to_string())
    );
    assert!(parse_pair("title").is_err());
    assert!(parse_pair("=x").is_err());
  }

  #[test]
  fn test_cache_refresh_takes_a_path() {
    let args = Args::try_parse_from(["ghtree", "cache", "refresh", "repos/alice"]).unwrap();

    match args.command {
      Command::Cache {
        command: CacheCommand::Refresh { path },
      } => assert_eq!(path, "repos/alice"),
      other => panic!("unexpected command {:?}", other),
    }
  }

  #[test]
  fn test_values_parse_as_json_when_possible() {
    let fields = to_fields(vec![
      ("private".to_string(), "true".to_string()),
      ("name".to_string(), "ghtree".to_string()),
      ("labels".to_string(), "[\"bug\"]".to_string()),
    ]);

    assert_eq!(fields["private"], json!(true));
    assert_eq!(fields["name"], json!("ghtree"));
    assert_eq!(fields["labels"], json!(["bug"]));
  }
}
