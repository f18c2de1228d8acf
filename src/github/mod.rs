//! The GitHub tree.
//!
//! ```text
//! root
//! ├── users/<user>                      User
//! │   ├── repos/<repo>                  Repo
//! │   │   └── issues/<number>           Issue
//! │   └── orgs/<org>                    Org
//! ├── repos/<user>/<repo>               Repo
//! └── orgs/<org>                        Org
//!     ├── members/<member>              Member
//!     └── teams/<team>                  Team
//!         ├── members/<member>          Member
//!         └── repos/<repo>              TeamRepo
//! ```

use tracing::debug;

use crate::cache::{CacheLayer, SqliteStorage};
use crate::config::{CacheConfig, Config};
use crate::error::{Error, Result};
use crate::transport::HttpTransport;
use crate::tree::{
  AddSpec, CollectionKind, ListSpec, NodeKind, Params, Registry, ResourceKind, Session, UrlSource,
  ROOT,
};

pub const USER: &str = "User";
pub const REPO: &str = "Repo";
pub const ISSUE: &str = "Issue";
pub const ORG: &str = "Org";
pub const MEMBER: &str = "Member";
pub const TEAM: &str = "Team";
pub const TEAM_REPO: &str = "TeamRepo";

pub const USERS: &str = "Users";
pub const OWNERS: &str = "Owners";
pub const ORGS: &str = "Orgs";
pub const USER_REPOS: &str = "UserRepos";
pub const USER_ORGS: &str = "UserOrgs";
pub const REPO_ISSUES: &str = "RepoIssues";
pub const ORG_MEMBERS: &str = "OrgMembers";
pub const ORG_TEAMS: &str = "OrgTeams";
pub const TEAM_MEMBERS: &str = "TeamMembers";
pub const TEAM_REPOS: &str = "TeamRepos";

/// Issue listings only return open issues unless asked otherwise.
const ISSUE_STATES: &[&str] = &["open", "closed"];

/// Build the GitHub tree.
pub fn registry() -> Registry {
  Registry::new()
    // Resources
    .with_resource(ResourceKind::new(USER, UrlSource::Resolver(user_url)))
    .with_resource(ResourceKind::new(
      REPO,
      UrlSource::Template("/repos/{user}/{repo}"),
    ))
    .with_resource(ResourceKind::new(
      ISSUE,
      UrlSource::Template("/repos/{user}/{repo}/issues/{number}"),
    ))
    .with_resource(ResourceKind::new(ORG, UrlSource::Template("/orgs/{org}")))
    .with_resource(ResourceKind::new(
      MEMBER,
      UrlSource::Template("/users/{member}"),
    ))
    .with_resource(ResourceKind::new(
      TEAM,
      UrlSource::Template("/orgs/{org}/teams/{team}"),
    ))
    .with_resource(ResourceKind::new(
      TEAM_REPO,
      UrlSource::Template("/repos/{org}/{team_repo}"),
    ))
    // Top level
    .with_collection(CollectionKind::new(USERS, NodeKind::Resource(USER), "user"))
    .with_collection(CollectionKind::new(
      OWNERS,
      NodeKind::Collection(USER_REPOS),
      "user",
    ))
    .with_collection(CollectionKind::new(ORGS, NodeKind::Resource(ORG), "org"))
    // Users
    .with_collection(
      CollectionKind::new(USER_REPOS, NodeKind::Resource(REPO), "repo")
        .keyed_by("name")
        .listable(ListSpec::new(UrlSource::Template("/users/{user}/repos")))
        .addable(AddSpec::post(UrlSource::Resolver(repo_create_url)).requiring(&["name"]))
        .deletable(UrlSource::Template("/repos/{user}/{repo}")),
    )
    .with_collection(
      CollectionKind::new(USER_ORGS, NodeKind::Resource(ORG), "org")
        .keyed_by("login")
        .listable(ListSpec::new(UrlSource::Template("/users/{user}/orgs"))),
    )
    // Repositories
    .with_collection(
      CollectionKind::new(REPO_ISSUES, NodeKind::Resource(ISSUE), "number")
        .keyed_by("number")
        .listable(
          ListSpec::new(UrlSource::Template("/repos/{user}/{repo}/issues"))
            .split_by("state", ISSUE_STATES),
        )
        .addable(
          AddSpec::post(UrlSource::Template("/repos/{user}/{repo}/issues"))
            .requiring(&["title"]),
        ),
    )
    // Organizations
    .with_collection(
      CollectionKind::new(ORG_MEMBERS, NodeKind::Resource(MEMBER), "member")
        .keyed_by("login")
        .listable(ListSpec::new(UrlSource::Template("/orgs/{org}/members")))
        .addable(AddSpec::put(UrlSource::Template(
          "/orgs/{org}/memberships/{member}",
        )))
        .deletable(UrlSource::Template("/orgs/{org}/members/{member}")),
    )
    .with_collection(
      CollectionKind::new(ORG_TEAMS, NodeKind::Resource(TEAM), "team")
        .keyed_by("slug")
        .listable(ListSpec::new(UrlSource::Template("/orgs/{org}/teams")))
        .addable(AddSpec::post(UrlSource::Template("/orgs/{org}/teams")).requiring(&["name"]))
        .deletable(UrlSource::Template("/orgs/{org}/teams/{team}")),
    )
    // Teams
    .with_collection(
      CollectionKind::new(TEAM_MEMBERS, NodeKind::Resource(MEMBER), "member")
        .keyed_by("login")
        .listable(ListSpec::new(UrlSource::Template(
          "/orgs/{org}/teams/{team}/members",
        )))
        .addable(AddSpec::put(UrlSource::Template(
          "/orgs/{org}/teams/{team}/memberships/{member}",
        )))
        .deletable(UrlSource::Template(
          "/orgs/{org}/teams/{team}/memberships/{member}",
        )),
    )
    // Team repositories are addressed within the organization.
    .with_collection(
      CollectionKind::new(TEAM_REPOS, NodeKind::Resource(TEAM_REPO), "team_repo")
        .keyed_by("name")
        .listable(ListSpec::new(UrlSource::Template(
          "/orgs/{org}/teams/{team}/repos",
        )))
        .addable(AddSpec::put(UrlSource::Template(
          "/orgs/{org}/teams/{team}/repos/{org}/{team_repo}",
        )))
        .deletable(UrlSource::Template(
          "/orgs/{org}/teams/{team}/repos/{org}/{team_repo}",
        )),
    )
    // Wiring
    .with_child(ROOT, "users", NodeKind::Collection(USERS))
    .with_child(ROOT, "repos", NodeKind::Collection(OWNERS))
    .with_child(ROOT, "orgs", NodeKind::Collection(ORGS))
    .with_child(USER, "repos", NodeKind::Collection(USER_REPOS))
    .with_child(USER, "orgs", NodeKind::Collection(USER_ORGS))
    .with_child(REPO, "issues", NodeKind::Collection(REPO_ISSUES))
    .with_child(ORG, "members", NodeKind::Collection(ORG_MEMBERS))
    .with_child(ORG, "teams", NodeKind::Collection(ORG_TEAMS))
    .with_child(TEAM, "members", NodeKind::Collection(TEAM_MEMBERS))
    .with_child(TEAM, "repos", NodeKind::Collection(TEAM_REPOS))
}

/// The authenticated user is only fully visible through `/user`.
fn user_url(session: &Session, params: &Params) -> Result<String> {
  if params.get("user").is_some() && params.get("user") == session.login() {
    Ok("/user".to_string())
  } else {
    params.render("/users/{user}")
  }
}

/// Repositories are created under `/user` for oneself and under the
/// organization otherwise. Other users' accounts are off limits.
fn repo_create_url(session: &Session, params: &Params) -> Result<String> {
  let owner = params.get("user").ok_or_else(|| Error::MissingParameter {
    template: "/users/{user}/repos".to_string(),
    param: "user".to_string(),
  })?;

  if session.login() == Some(owner) {
    return Ok("/user/repos".to_string());
  }

  let mut account = session
    .root()
    .child("users")?
    .child(owner)?
    .into_resource()?;
  let is_org = match account.get("type") {
    Ok(kind) => kind.as_str() == Some("Organization"),
    Err(e) if e.is_not_found() => false,
    Err(e) => return Err(e),
  };

  if is_org {
    debug!("{} is an organization", owner);
    params.render("/orgs/{user}/repos")
  } else {
    Err(Error::Unsupported {
      kind: USER_REPOS.to_string(),
      operation: "creating repositories for another user",
    })
  }
}

/// Open the cache described by the configuration.
pub fn cache_layer(config: &CacheConfig) -> Result<CacheLayer> {
  if !config.enabled {
    return Ok(CacheLayer::disabled());
  }

  let path = match &config.path {
    Some(path) => path.clone(),
    None => SqliteStorage::default_path()?,
  };

  config
    .ttl
    .iter()
    .try_fold(CacheLayer::new(SqliteStorage::open(&path)?), |layer, (kind, secs)| {
      let ttl = chrono::Duration::try_seconds(*secs)
        .ok_or_else(|| Error::Config(format!("ttl for {} out of range", kind)))?;
      Ok(layer.with_ttl(kind.as_str(), ttl))
    })
}

/// Create a session against the configured GitHub instance.
pub fn connect(config: &Config) -> Result<Session> {
  let user = config.user()?;
  let token = config.api_token()?;

  let transport =
    HttpTransport::new(config.api_url(), user, &token)?.with_wire_log(config.debug >= 2);
  let cache = cache_layer(&config.cache)?;

  let registry = registry();
  registry.validate()?;

  debug!("connected to {} as {}", config.api_url(), user);
  Ok(Session::new(transport, cache, registry).with_login(user))
}
