mod builder;
pub mod cache;
mod limiter;
pub mod page;
pub mod payload;

use async_trait::async_trait;
use cache::TtlCache;
use log::debug;
use log::info;
use page::PageOutcome;
use repo_insights::api::Collection;
use repo_insights::api::Commit;
use repo_insights::api::Contributor;
use repo_insights::api::EntityKind;
use repo_insights::api::Error;
use repo_insights::api::PullRequest;
use repo_insights::api::PullState;
use repo_insights::api::Query;
use repo_insights::api::Repo;
use repo_insights::api::Result;
use repo_insights::api::FIRST_PAGE_NUMBER;
use repo_insights::api::PAGE_SIZE;
use reqwest::Client;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use url::Url;

pub use builder::GithubClientBuilder;
pub use limiter::RateBudget;
pub use limiter::SharedRateBudget;

type CacheKey = (EntityKind, String);

pub struct GithubClient {
    client: Client,
    github_url: Url,
    limiter: limiter::RateLimiter,
    cache: Option<Mutex<TtlCache<CacheKey, Vec<Repo>>>>,
    query_timeout: Option<Duration>,
}

impl GithubClient {
    /// Fetches every page of `query` in page order.
    ///
    /// Pagination stops after the first page shorter than [`PAGE_SIZE`], on 204 and on 409.
    /// Any other failure stops it too and yields [`Collection::Partial`] with the records received so far.
    pub async fn fetch<T: DeserializeOwned>(&self, query: &Query) -> Collection<T> {
        let url = match self.endpoint(query) {
            Ok(url) => url,
            Err(cause) => {
                return Collection::Partial {
                    items: Vec::new(),
                    cause,
                }
            }
        };
        let mut deadline = self.query_timeout.map(|timeout| (Instant::now() + timeout, timeout));
        let mut items = Vec::new();
        let mut page_no = FIRST_PAGE_NUMBER;
        loop {
            // Rate limit pauses do not count against the query timeout.
            let paused = self.limiter.wait().await;
            if let Some((at, _)) = deadline.as_mut() {
                *at += paused;
            }
            let page = self.fetch_page::<T>(&url, query, page_no);
            let outcome = match deadline {
                Some((deadline, timeout)) => tokio::time::timeout_at(deadline, page)
                    .await
                    .unwrap_or(PageOutcome::TransientFailure(Error::Timeout(timeout))),
                None => page.await,
            };
            match outcome {
                PageOutcome::Success(page) => {
                    debug!("Fetched page {} of {} with {} records", page.number, query, page.records.len());
                    let more = page.may_have_more();
                    items.extend(page.records);
                    if !more {
                        break;
                    }
                    page_no += 1;
                }
                PageOutcome::EmptyTerminal => {
                    debug!("No more {} after page {}", query, page_no - 1);
                    break;
                }
                PageOutcome::ConflictTerminal => {
                    info!("Resource not available or empty: {}", query);
                    break;
                }
                PageOutcome::TransientFailure(cause) => {
                    debug!("Stopped {} at page {}: {}", query, page_no, cause);
                    return Collection::Partial { items, cause };
                }
            }
        }
        Collection::Complete(items)
    }

    /// Repositories of `owner`, served from the cache while a complete listing younger than the TTL exists.
    pub async fn fetch_cached(&self, owner: &str) -> Collection<Repo> {
        let query = Query::repositories(owner);
        let cache = match &self.cache {
            Some(cache) => cache,
            None => return self.fetch::<payload::Repo>(&query).await.map(Repo::from),
        };
        let key = (query.kind(), owner.to_string());
        if let Some(repos) = cache.lock().await.get(&key) {
            debug!("Cache hit for {}", query);
            return Collection::Complete(repos.clone());
        }
        let repos = self.fetch::<payload::Repo>(&query).await.map(Repo::from);
        if let Collection::Complete(items) = &repos {
            cache.lock().await.put(key, items.clone());
        }
        repos
    }

    pub fn rate_budget(&self) -> SharedRateBudget {
        self.limiter.budget()
    }

    async fn fetch_page<T: DeserializeOwned>(&self, url: &Url, query: &Query, page_no: u32) -> PageOutcome<T> {
        let mut params = vec![("page", page_no.to_string()), ("per_page", PAGE_SIZE.to_string())];
        if let Some(state) = query.state() {
            params.push(("state", state.to_string()));
        }
        let response = match self.client.get(url.clone()).query(&params).send().await {
            Ok(response) => response,
            Err(err) => return PageOutcome::TransientFailure(Error::Upstream(err)),
        };
        let budget = self.limiter.update(response.headers()).await;
        let status = response.status();
        if matches!(status, StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS) {
            if let Some(budget) = budget.filter(|budget| budget.remaining == 0) {
                return PageOutcome::TransientFailure(Error::RateLimited { reset: budget.reset });
            }
        }
        PageOutcome::from_response(page_no, response).await
    }

    fn endpoint(&self, query: &Query) -> Result<Url> {
        let owner = query.owner();
        let path: Vec<&str> = match (query.kind(), query.repo()) {
            (EntityKind::Repositories, _) => vec!["users", owner, "repos"],
            (EntityKind::Commits, Some(repo)) => vec!["repos", owner, repo, "commits"],
            (EntityKind::PullRequests, Some(repo)) => vec!["repos", owner, repo, "pulls"],
            (EntityKind::Contributors, Some(repo)) => vec!["repos", owner, repo, "contributors"],
            (_, None) => return Err(Error::Error("Query requires a repository name")),
        };
        self.url(&path)
    }

    fn url(&self, path: &[&str]) -> Result<Url> {
        let mut url = self.github_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Error("API URL cannot be a base"))?
            .pop_if_empty()
            .extend(path);
        Ok(url)
    }
}

#[async_trait]
impl repo_insights::api::Client for GithubClient {
    async fn user_repos(&self, owner: &str) -> Collection<Repo> {
        self.fetch_cached(owner).await
    }

    async fn repo_commits(&self, owner: &str, repo: &str) -> Collection<Commit> {
        self.fetch::<payload::Commit>(&Query::commits(owner, repo))
            .await
            .map(Commit::from)
    }

    async fn repo_pull_requests(&self, owner: &str, repo: &str, state: PullState) -> Collection<PullRequest> {
        self.fetch::<payload::PullRequest>(&Query::pull_requests(owner, repo, state))
            .await
            .map(PullRequest::from)
    }

    async fn repo_contributors(&self, owner: &str, repo: &str) -> Collection<Contributor> {
        self.fetch::<payload::Contributor>(&Query::contributors(owner, repo))
            .await
            .map(Contributor::from)
    }

    async fn user_repo_count(&self, owner: &str) -> Result<u32> {
        let url = self.url(&["users", owner])?;
        self.limiter.wait().await;
        let response = self.client.get(url).send().await?;
        self.limiter.update(response.headers()).await;
        let user = response.error_for_status()?.json::<payload::User>().await?;
        Ok(user.public_repos)
    }
}
