use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use derive_more::Constructor;
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

/// Largest page the upstream listing endpoints hand out.
pub const PAGE_SIZE: u32 = 100;
pub const FIRST_PAGE_NUMBER: u32 = 1;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Error: {0}")]
    Error(&'static str),
    #[error("Upstream unavailable: {0}")]
    Upstream(#[from] reqwest::Error),
    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },
    #[error("Rate limited until {reset}")]
    RateLimited { reset: i64 },
    #[error("Query timed out after {} sec", .0.as_secs())]
    Timeout(Duration),
    #[error("Malformed payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum EntityKind {
    Repositories,
    Commits,
    PullRequests,
    Contributors,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum PullState {
    #[default]
    All,
    Open,
    Closed,
}

/// One logical listing request. Every kind except `Repositories` is scoped to a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    kind: EntityKind,
    owner: String,
    repo: Option<String>,
    state: Option<PullState>,
}

impl Query {
    pub fn repositories(owner: impl Into<String>) -> Self {
        Self::scoped(EntityKind::Repositories, owner.into(), None, None)
    }

    pub fn commits(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self::scoped(EntityKind::Commits, owner.into(), Some(repo.into()), None)
    }

    pub fn pull_requests(owner: impl Into<String>, repo: impl Into<String>, state: PullState) -> Self {
        Self::scoped(EntityKind::PullRequests, owner.into(), Some(repo.into()), Some(state))
    }

    pub fn contributors(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self::scoped(EntityKind::Contributors, owner.into(), Some(repo.into()), None)
    }

    fn scoped(kind: EntityKind, owner: String, repo: Option<String>, state: Option<PullState>) -> Self {
        Query {
            kind,
            owner,
            repo,
            state,
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repo(&self) -> Option<&str> {
        self.repo.as_deref()
    }

    pub fn state(&self) -> Option<PullState> {
        self.state
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.repo {
            Some(repo) => write!(f, "{} of {}/{}", self.kind, self.owner, repo),
            None => write!(f, "{} of {}", self.kind, self.owner),
        }
    }
}

/// All records of one [`Query`] in page order.
///
/// `Partial` means pagination stopped on a failure; its records are valid but not exhaustive,
/// so an empty `Partial` is never the same thing as an empty `Complete`.
#[derive(Debug)]
pub enum Collection<T> {
    Complete(Vec<T>),
    Partial { items: Vec<T>, cause: Error },
}

impl<T> Collection<T> {
    pub fn is_complete(&self) -> bool {
        matches!(self, Collection::Complete(_))
    }

    pub fn items(&self) -> &[T] {
        match self {
            Collection::Complete(items) => items,
            Collection::Partial { items, .. } => items,
        }
    }

    pub fn into_items(self) -> Vec<T> {
        match self {
            Collection::Complete(items) => items,
            Collection::Partial { items, .. } => items,
        }
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    pub fn cause(&self) -> Option<&Error> {
        match self {
            Collection::Complete(_) => None,
            Collection::Partial { cause, .. } => Some(cause),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Collection<U> {
        match self {
            Collection::Complete(items) => Collection::Complete(items.into_iter().map(f).collect()),
            Collection::Partial { items, cause } => Collection::Partial {
                items: items.into_iter().map(f).collect(),
                cause,
            },
        }
    }

    /// Drops partial records and surfaces the failure instead.
    pub fn into_result(self) -> Result<Vec<T>> {
        match self {
            Collection::Complete(items) => Ok(items),
            Collection::Partial { cause, .. } => Err(cause),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Repo {
    pub name: String,
    pub owner: String,
    pub stars: u32,
    pub forks: u32,
    pub language: Option<String>,
    /// Size in KB as reported upstream.
    pub size: u64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Constructor)]
pub struct Commit {
    pub sha: String,
    pub author: String,
    pub date: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contributor {
    pub login: String,
    pub contributions: u32,
}

impl Contributor {
    pub fn new(login: impl Into<String>, contributions: u32) -> Self {
        Contributor {
            login: login.into(),
            contributions,
        }
    }
}

#[async_trait]
pub trait Client: Send + Sync {
    /// All repositories of `owner`. Implementations may serve this from a cache.
    async fn user_repos(&self, owner: &str) -> Collection<Repo>;

    async fn repo_commits(&self, owner: &str, repo: &str) -> Collection<Commit>;

    async fn repo_pull_requests(&self, owner: &str, repo: &str, state: PullState) -> Collection<PullRequest>;

    async fn repo_contributors(&self, owner: &str, repo: &str) -> Collection<Contributor>;

    /// Public repository count from the owner's profile.
    async fn user_repo_count(&self, owner: &str) -> Result<u32>;
}

#[test]
fn partial_collection_keeps_items_and_cause_test() {
    let collection = Collection::Partial {
        items: vec![1, 2],
        cause: Error::Status {
            status: 500,
            url: "http://localhost/repos".to_string(),
        },
    };
    assert!(!collection.is_complete());
    assert_eq!(collection.len(), 2);
    let collection = collection.map(|n| n * 10);
    assert_eq!(collection.items(), &[10, 20]);
    assert!(matches!(collection.into_result(), Err(Error::Status { status: 500, .. })));
}

#[test]
fn empty_complete_collection_is_not_a_failure_test() {
    let collection: Collection<u8> = Collection::Complete(Vec::new());
    assert!(collection.is_complete());
    assert!(collection.is_empty());
    assert!(collection.cause().is_none());
}

#[test]
fn query_display_and_scope_test() {
    let query = Query::pull_requests("octo", "demo", PullState::All);
    assert_eq!(query.kind(), EntityKind::PullRequests);
    assert_eq!(query.repo(), Some("demo"));
    assert_eq!(query.to_string(), "pull-requests of octo/demo");
    assert_eq!(Query::repositories("octo").repo(), None);
    assert_eq!("closed".parse::<PullState>().unwrap(), PullState::Closed);
    assert_eq!(PullState::All.as_ref(), "all");
}
