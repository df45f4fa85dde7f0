use crate::api::{Client, Collection, Commit, Contributor, Error, PullRequest, PullState, Repo, Result};
use crate::stats::{self, Bin, PullRequestStats};
use chrono::Weekday;
use futures::{stream, StreamExt};
use log::{debug, error, warn};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

pub struct Analyzer<CLIENT>
where
    CLIENT: 'static + Client,
{
    client: Arc<CLIENT>,
    max_parallel_requests: usize,
    top_n: usize,
}

/// Repositories whose listing came back complete vs. cut short by a failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub processed: usize,
    pub skipped: usize,
}

impl Tally {
    fn record<T>(&mut self, phase: &str, repo: &str, collection: &Collection<T>) {
        match collection.cause() {
            None => self.processed += 1,
            Some(cause) => {
                error!("Failed to get {} of {}: {}", phase, repo, cause);
                self.skipped += 1;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepoSummary {
    pub total: usize,
    /// `false` when the repository listing itself stopped early.
    pub complete: bool,
    pub top_starred: Vec<Repo>,
    pub top_forked: Vec<Repo>,
    pub recent_activity: Vec<Repo>,
    pub language_breakdown: BTreeMap<String, usize>,
    pub size_distribution: Vec<Bin>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommitSummary {
    pub tally: Tally,
    pub total: usize,
    pub time_distribution: Vec<(Weekday, usize)>,
    pub average_frequency: f64,
    pub longest_streak: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PullSummary {
    pub tally: Tally,
    pub total: usize,
    pub stats: PullRequestStats,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContributorSummary {
    pub tally: Tally,
    pub unique: usize,
    pub repos_without: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub owner: String,
    pub reported_repo_count: Option<u32>,
    pub repos: RepoSummary,
    pub commits: CommitSummary,
    pub pulls: PullSummary,
    pub contributors: ContributorSummary,
}

impl<CLIENT> Analyzer<CLIENT>
where
    CLIENT: 'static + Client,
{
    /// # Arguments
    /// * `client` - Source of all listings
    /// * `max_parallel_requests` - Repositories fetched at once in each phase, `1` fetches them one by one
    /// * `top_n` - Length of the rankings
    pub fn new(client: CLIENT, max_parallel_requests: usize, top_n: usize) -> Self {
        Analyzer {
            client: Arc::new(client),
            max_parallel_requests: max_parallel_requests.max(1),
            top_n,
        }
    }

    pub async fn analyze(&self, owner: &str) -> Result<Analysis> {
        let (repos, complete) = match self.client.user_repos(owner).await {
            Collection::Complete(repos) => (repos, true),
            Collection::Partial { items, cause } if !items.is_empty() => {
                warn!("Repository listing of {} is incomplete: {}", owner, cause);
                (items, false)
            }
            Collection::Partial { cause, .. } => return Err(cause),
        };
        debug!("Analyzing {} repositories of {}", repos.len(), owner);

        let reported_repo_count = match self.client.user_repo_count(owner).await {
            Ok(count) => Some(count),
            Err(err) => {
                warn!("Failed to get repository count of {}: {}", owner, err);
                None
            }
        };

        let commits = self
            .fan_out(owner, &repos, |client, owner, repo| async move {
                client.repo_commits(&owner, &repo).await
            })
            .await;
        let pulls = self
            .fan_out(owner, &repos, |client, owner, repo| async move {
                client.repo_pull_requests(&owner, &repo, PullState::All).await
            })
            .await;
        let contributors = self
            .fan_out(owner, &repos, |client, owner, repo| async move {
                client.repo_contributors(&owner, &repo).await
            })
            .await;

        Ok(Analysis {
            owner: owner.to_string(),
            reported_repo_count,
            repos: self.repo_summary(&repos, complete),
            commits: commit_summary(commits),
            pulls: pull_summary(pulls),
            contributors: contributor_summary(contributors),
        })
    }

    fn repo_summary(&self, repos: &[Repo], complete: bool) -> RepoSummary {
        RepoSummary {
            total: repos.len(),
            complete,
            top_starred: stats::most_starred(repos, self.top_n),
            top_forked: stats::most_forked(repos, self.top_n),
            recent_activity: stats::most_recent_activity(repos, self.top_n),
            language_breakdown: stats::language_breakdown(repos),
            size_distribution: stats::size_distribution(repos, stats::DEFAULT_SIZE_BINS),
        }
    }

    /// Runs `fetch` for every repository, at most `max_parallel_requests` at a time.
    /// Results arrive in completion order, not in `repos` order.
    async fn fan_out<T, F, FUT>(&self, owner: &str, repos: &[Repo], fetch: F) -> Vec<(String, Collection<T>)>
    where
        T: 'static + Send,
        F: Fn(Arc<CLIENT>, String, String) -> FUT,
        FUT: 'static + Future<Output = Collection<T>> + Send,
    {
        let tasks: Vec<_> = repos
            .iter()
            .map(|repo| {
                let task = fetch(self.client.clone(), owner.to_string(), repo.name.clone());
                (repo.name.clone(), task)
            })
            .collect();
        stream::iter(tasks)
            .map(|(repo, task)| async move {
                match tokio::spawn(task).await {
                    Ok(collection) => (repo, collection),
                    Err(err) => {
                        let cause = Error::Other(anyhow::anyhow!("task failed: {}", err));
                        (repo, Collection::Partial { items: Vec::new(), cause })
                    }
                }
            })
            .buffer_unordered(self.max_parallel_requests)
            .collect()
            .await
    }
}

/// Utility functions

fn commit_summary(per_repo: Vec<(String, Collection<Commit>)>) -> CommitSummary {
    let mut tally = Tally::default();
    let mut commits = Vec::new();
    for (repo, collection) in per_repo {
        tally.record("commits", &repo, &collection);
        commits.extend(collection.into_items());
    }
    CommitSummary {
        tally,
        total: commits.len(),
        time_distribution: stats::commit_time_distribution(&commits),
        average_frequency: stats::average_commit_frequency(&commits),
        longest_streak: stats::longest_streak(&commits),
    }
}

fn pull_summary(per_repo: Vec<(String, Collection<PullRequest>)>) -> PullSummary {
    let mut tally = Tally::default();
    let mut total = 0;
    let mut pr_stats = PullRequestStats::default();
    for (repo, collection) in per_repo {
        tally.record("pull requests", &repo, &collection);
        total += collection.len();
        pr_stats += stats::pull_request_stats(collection.items());
    }
    PullSummary {
        tally,
        total,
        stats: pr_stats,
    }
}

fn contributor_summary(per_repo: Vec<(String, Collection<Contributor>)>) -> ContributorSummary {
    let mut tally = Tally::default();
    for (repo, collection) in &per_repo {
        tally.record("contributors", repo, collection);
    }
    // A failed listing with nothing in it says nothing about the repository's contributors.
    let known = per_repo
        .iter()
        .filter(|(_, collection)| collection.is_complete() || !collection.is_empty())
        .map(|(_, collection)| collection.items());
    let (unique, repos_without) = stats::contributor_summary(known);
    ContributorSummary {
        tally,
        unique,
        repos_without,
    }
}
