//! Small tree used by the node tests.

use serde_json::Value;
use std::sync::Arc;

use super::registry::{
  AddSpec, CollectionKind, ListSpec, NodeKind, Registry, ResourceKind, UrlSource, ROOT,
};
use super::resource::Fields;
use super::session::Session;
use crate::cache::{CacheLayer, SqliteStorage};
use crate::transport::mock::MockTransport;

pub(crate) fn registry() -> Registry {
  Registry::new()
    .with_resource(ResourceKind::new(
      "User",
      UrlSource::Template("/users/{user}"),
    ))
    .with_resource(ResourceKind::new(
      "Repo",
      UrlSource::Template("/repos/{user}/{repo}"),
    ))
    .with_resource(ResourceKind::new(
      "Issue",
      UrlSource::Template("/repos/{user}/{repo}/issues/{number}"),
    ))
    .with_resource(ResourceKind::new(
      "Member",
      UrlSource::Template("/users/{member}"),
    ))
    .with_collection(CollectionKind::new(
      "Users",
      NodeKind::Resource("User"),
      "user",
    ))
    .with_collection(CollectionKind::new(
      "Owners",
      NodeKind::Collection("Repos"),
      "user",
    ))
    .with_collection(
      CollectionKind::new("Repos", NodeKind::Resource("Repo"), "repo")
        .keyed_by("name")
        .listable(ListSpec::new(UrlSource::Template("/users/{user}/repos")))
        .addable(AddSpec::post(UrlSource::Template("/user/repos")).requiring(&["name"]))
        .deletable(UrlSource::Template("/repos/{user}/{repo}")),
    )
    .with_collection(
      CollectionKind::new("Issues", NodeKind::Resource("Issue"), "number")
        .keyed_by("number")
        .listable(
          ListSpec::new(UrlSource::Template("/repos/{user}/{repo}/issues"))
            .split_by("state", &["open", "closed"]),
        ),
    )
    .with_collection(CollectionKind::new(
      "Orgs",
      NodeKind::Collection("Members"),
      "org",
    ))
    .with_collection(
      CollectionKind::new("Members", NodeKind::Resource("Member"), "member")
        .keyed_by("login")
        .listable(ListSpec::new(UrlSource::Template("/orgs/{org}/members")))
        .addable(AddSpec::put(UrlSource::Template(
          "/orgs/{org}/memberships/{member}",
        )))
        .deletable(UrlSource::Template("/orgs/{org}/members/{member}")),
    )
    .with_child(ROOT, "users", NodeKind::Collection("Users"))
    .with_child(ROOT, "repos", NodeKind::Collection("Owners"))
    .with_child(ROOT, "orgs", NodeKind::Collection("Orgs"))
    .with_child("Repo", "issues", NodeKind::Collection("Issues"))
}

/// Session over `mock` with a fresh in-memory cache.
pub(crate) fn session_with(mock: &Arc<MockTransport>) -> Session {
  let cache = CacheLayer::new(SqliteStorage::open_in_memory().unwrap());
  Session::new(Arc::clone(mock), cache, registry())
}

pub(crate) fn fields(value: Value) -> Fields {
  match value {
    Value::Object(fields) => fields,
    other => panic!("expected an object, got {}", other),
  }
}
