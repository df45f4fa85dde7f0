use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Deserialize, Debug)]
pub struct Repo {
    pub name: String,
    pub owner: RepoOwner,
    pub stargazers_count: u32,
    pub forks_count: u32,
    pub language: Option<String>,
    pub size: u64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug)]
pub struct RepoOwner {
    pub login: String,
}

impl From<Repo> for repo_insights::api::Repo {
    fn from(repo: Repo) -> Self {
        repo_insights::api::Repo {
            name: repo.name,
            owner: repo.owner.login,
            stars: repo.stargazers_count,
            forks: repo.forks_count,
            language: repo.language,
            size: repo.size,
            updated_at: repo.updated_at,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct Commit {
    pub sha: String,
    pub commit: CommitDetail,
}

#[derive(Deserialize, Debug)]
pub struct CommitDetail {
    pub author: CommitAuthor,
    #[serde(default)]
    pub message: String,
}

#[derive(Deserialize, Debug)]
pub struct CommitAuthor {
    pub name: String,
    pub date: DateTime<Utc>,
}

impl From<Commit> for repo_insights::api::Commit {
    fn from(commit: Commit) -> Self {
        repo_insights::api::Commit {
            sha: commit.sha,
            author: commit.commit.author.name,
            date: commit.commit.author.date,
            message: commit.commit.message,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl From<PullRequest> for repo_insights::api::PullRequest {
    fn from(pr: PullRequest) -> Self {
        repo_insights::api::PullRequest {
            number: pr.number,
            title: pr.title,
            state: pr.state,
            created_at: pr.created_at,
            closed_at: pr.closed_at,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct Contributor {
    pub login: String,
    pub contributions: u32,
}

impl From<Contributor> for repo_insights::api::Contributor {
    fn from(contributor: Contributor) -> Self {
        repo_insights::api::Contributor {
            login: contributor.login,
            contributions: contributor.contributions,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct User {
    pub public_repos: u32,
}
