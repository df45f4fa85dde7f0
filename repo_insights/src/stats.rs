use crate::api::{Commit, Contributor, PullRequest, Repo};
use chrono::{Datelike, NaiveDate, Weekday};
use derive_more::Constructor;
use std::collections::{BTreeMap, BTreeSet, HashSet};

pub const DEFAULT_TOP_N: usize = 5;
pub const DEFAULT_SIZE_BINS: usize = 20;

pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Repositories with the most stars, highest first. Ties keep input order.
pub fn most_starred(repos: &[Repo], top_n: usize) -> Vec<Repo> {
    top_by(repos, top_n, |repo| repo.stars)
}

/// Repositories with the most forks, highest first. Ties keep input order.
pub fn most_forked(repos: &[Repo], top_n: usize) -> Vec<Repo> {
    top_by(repos, top_n, |repo| repo.forks)
}

/// Most recently updated repositories, newest first.
pub fn most_recent_activity(repos: &[Repo], top_n: usize) -> Vec<Repo> {
    top_by(repos, top_n, |repo| repo.updated_at)
}

fn top_by<K: Ord>(repos: &[Repo], top_n: usize, key: impl Fn(&Repo) -> K) -> Vec<Repo> {
    let mut sorted: Vec<&Repo> = repos.iter().collect();
    sorted.sort_by(|a, b| key(b).cmp(&key(a)));
    sorted.into_iter().take(top_n).cloned().collect()
}

/// Number of repositories per primary language. Repositories without a detected language are left out.
pub fn language_breakdown(repos: &[Repo]) -> BTreeMap<String, usize> {
    let mut languages = BTreeMap::new();
    for language in repos.iter().filter_map(|repo| repo.language.as_deref()) {
        *languages.entry(language.to_string()).or_insert(0) += 1;
    }
    languages
}

#[derive(Debug, Clone, PartialEq, Constructor)]
pub struct Bin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Equal-width histogram of repository sizes (KB).
///
/// # Arguments
/// * `repos` - Repositories to bucket
/// * `bins` - Number of buckets covering `[min size, max size]`; the last bucket is closed on both ends
pub fn size_distribution(repos: &[Repo], bins: usize) -> Vec<Bin> {
    let (min, max) = match (
        repos.iter().map(|repo| repo.size).min(),
        repos.iter().map(|repo| repo.size).max(),
    ) {
        (Some(min), Some(max)) if bins > 0 => (min as f64, max as f64),
        _ => return Vec::new(),
    };
    // Degenerate range collapses into one unit-wide bucket per bin.
    let width = if max > min { (max - min) / bins as f64 } else { 1.0 };
    let mut histogram: Vec<Bin> = (0..bins)
        .map(|i| Bin::new(min + width * i as f64, min + width * (i + 1) as f64, 0))
        .collect();
    for repo in repos {
        let index = (((repo.size as f64 - min) / width) as usize).min(bins - 1);
        histogram[index].count += 1;
    }
    histogram
}

/// Commit counts per weekday (UTC), Monday first.
pub fn commit_time_distribution(commits: &[Commit]) -> Vec<(Weekday, usize)> {
    let mut counts = [0usize; 7];
    for commit in commits {
        counts[commit.date.weekday().num_days_from_monday() as usize] += 1;
    }
    WEEKDAYS.iter().copied().zip(counts).collect()
}

/// Average commits per day over the span between the first and last commit day, both inclusive.
pub fn average_commit_frequency(commits: &[Commit]) -> f64 {
    let days = commits.iter().map(|commit| commit.date.date_naive());
    match (days.clone().min(), days.max()) {
        (Some(first), Some(last)) => commits.len() as f64 / ((last - first).num_days() + 1) as f64,
        _ => 0.0,
    }
}

/// Longest run of consecutive calendar days with at least one commit.
pub fn longest_streak(commits: &[Commit]) -> usize {
    let days: BTreeSet<NaiveDate> = commits.iter().map(|commit| commit.date.date_naive()).collect();
    let mut longest = 0;
    let mut current = 0;
    let mut previous: Option<NaiveDate> = None;
    for day in days {
        current = match previous {
            Some(previous) if (day - previous).num_days() == 1 => current + 1,
            _ => 1,
        };
        longest = longest.max(current);
        previous = Some(day);
    }
    longest
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Constructor)]
pub struct PullRequestStats {
    pub opened: usize,
    pub closed: usize,
}

impl std::ops::AddAssign for PullRequestStats {
    fn add_assign(&mut self, other: Self) {
        self.opened += other.opened;
        self.closed += other.closed;
    }
}

pub fn pull_request_stats(pull_requests: &[PullRequest]) -> PullRequestStats {
    pull_requests
        .iter()
        .fold(PullRequestStats::default(), |mut stats, pr| {
            match pr.state.as_str() {
                "open" => stats.opened += 1,
                "closed" => stats.closed += 1,
                _ => {}
            }
            stats
        })
}

/// Returns count of unique contributor logins and count of repositories without any contributor.
///
/// # Arguments
/// * `per_repo` - Contributors of each repository, one entry per repository
pub fn contributor_summary<'a, I>(per_repo: I) -> (usize, usize)
where
    I: IntoIterator<Item = &'a [Contributor]>,
{
    let mut logins = HashSet::new();
    let mut without_contributors = 0;
    for contributors in per_repo {
        if contributors.is_empty() {
            without_contributors += 1;
        }
        logins.extend(contributors.iter().map(|contributor| contributor.login.as_str()));
    }
    (logins.len(), without_contributors)
}

/// Tests

#[cfg(test)]
fn repo(name: &str, stars: u32, forks: u32, language: Option<&str>, size: u64, updated: &str) -> Repo {
    Repo {
        name: name.to_string(),
        owner: "octo".to_string(),
        stars,
        forks,
        language: language.map(str::to_string),
        size,
        updated_at: updated.parse().unwrap(),
    }
}

#[cfg(test)]
fn commit_on(date: &str) -> Commit {
    Commit::new("sha".to_string(), "octo".to_string(), date.parse().unwrap(), "msg".to_string())
}

#[test]
fn rankings_test() {
    let repos = vec![
        repo("a", 1, 9, Some("Rust"), 10, "2024-01-01T00:00:00Z"),
        repo("b", 5, 0, Some("Go"), 20, "2024-03-01T00:00:00Z"),
        repo("c", 3, 4, None, 30, "2024-02-01T00:00:00Z"),
    ];
    let names = |repos: Vec<Repo>| repos.into_iter().map(|r| r.name).collect::<Vec<_>>();
    assert_eq!(names(most_starred(&repos, 2)), vec!["b", "c"]);
    assert_eq!(names(most_forked(&repos, 5)), vec!["a", "c", "b"]);
    assert_eq!(names(most_recent_activity(&repos, 1)), vec!["b"]);
}

#[test]
fn language_breakdown_skips_unknown_test() {
    let repos = vec![
        repo("a", 0, 0, Some("Rust"), 1, "2024-01-01T00:00:00Z"),
        repo("b", 0, 0, Some("Rust"), 1, "2024-01-01T00:00:00Z"),
        repo("c", 0, 0, None, 1, "2024-01-01T00:00:00Z"),
        repo("d", 0, 0, Some("Python"), 1, "2024-01-01T00:00:00Z"),
    ];
    let breakdown = language_breakdown(&repos);
    assert_eq!(breakdown.len(), 2);
    assert_eq!(breakdown["Rust"], 2);
    assert_eq!(breakdown["Python"], 1);
}

#[test]
fn size_distribution_test() {
    let repos = vec![
        repo("a", 0, 0, None, 0, "2024-01-01T00:00:00Z"),
        repo("b", 0, 0, None, 50, "2024-01-01T00:00:00Z"),
        repo("c", 0, 0, None, 100, "2024-01-01T00:00:00Z"),
    ];
    let histogram = size_distribution(&repos, 4);
    assert_eq!(histogram.len(), 4);
    let counts: Vec<usize> = histogram.iter().map(|bin| bin.count).collect();
    assert_eq!(counts, vec![1, 0, 1, 1]);
    assert_eq!(histogram[3].upper, 100.0);
    assert!(size_distribution(&[], 4).is_empty());
}

#[test]
fn commit_time_distribution_test() {
    // 2024-01-01 is a Monday
    let commits = vec![
        commit_on("2024-01-01T10:00:00Z"),
        commit_on("2024-01-01T23:00:00Z"),
        commit_on("2024-01-07T12:00:00Z"),
    ];
    let distribution = commit_time_distribution(&commits);
    assert_eq!(distribution[0], (Weekday::Mon, 2));
    assert_eq!(distribution[6], (Weekday::Sun, 1));
    assert_eq!(distribution.iter().map(|(_, count)| count).sum::<usize>(), 3);
}

#[test]
fn average_commit_frequency_test() {
    let commits = vec![
        commit_on("2024-01-01T10:00:00Z"),
        commit_on("2024-01-02T10:00:00Z"),
        commit_on("2024-01-04T10:00:00Z"),
        commit_on("2024-01-04T11:00:00Z"),
    ];
    assert_eq!(average_commit_frequency(&commits), 1.0);
    assert_eq!(average_commit_frequency(&[]), 0.0);
}

#[test]
fn longest_streak_test() {
    let commits = vec![
        commit_on("2024-01-01T10:00:00Z"),
        commit_on("2024-01-02T10:00:00Z"),
        commit_on("2024-01-02T18:00:00Z"),
        commit_on("2024-01-03T10:00:00Z"),
        commit_on("2024-01-10T10:00:00Z"),
        commit_on("2024-01-11T10:00:00Z"),
    ];
    assert_eq!(longest_streak(&commits), 3);
    assert_eq!(longest_streak(&commits[4..]), 2);
    assert_eq!(longest_streak(&[]), 0);
}

#[test]
fn pull_request_stats_test() {
    let pr = |state: &str| PullRequest {
        number: 1,
        title: "t".to_string(),
        state: state.to_string(),
        created_at: "2024-01-01T00:00:00Z".parse().unwrap(),
        closed_at: None,
    };
    let stats = pull_request_stats(&[pr("open"), pr("closed"), pr("closed"), pr("draft")]);
    assert_eq!(stats, PullRequestStats::new(1, 2));
}

#[test]
fn contributor_summary_test() {
    let first = vec![Contributor::new("a", 7), Contributor::new("b", 2)];
    let second = vec![Contributor::new("b", 1), Contributor::new("c", 4)];
    let empty: Vec<Contributor> = Vec::new();
    let summary = contributor_summary([first.as_slice(), second.as_slice(), empty.as_slice()]);
    assert_eq!(summary, (3, 1));
}
