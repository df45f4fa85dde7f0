use repo_insights::analyzer::{CommitSummary, ContributorSummary, PullSummary, RepoSummary};
use repo_insights::Analysis;
use std::fmt::{Display, Formatter, Result};

const BAR_WIDTH: usize = 40;

pub struct RepoView<'a>(pub &'a RepoSummary);
pub struct CommitView<'a>(pub &'a CommitSummary);
pub struct PullRequestView<'a>(pub &'a PullSummary);
pub struct SummaryView<'a>(pub &'a Analysis);

/// Every view of `analysis`, one after another.
pub struct AnalysisReport<'a>(pub &'a Analysis);

impl Display for RepoView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let repos = self.0;
        heading(f, "Repository Analysis Results")?;

        writeln!(f, "\nTop Starred Repositories:")?;
        for repo in &repos.top_starred {
            writeln!(f, "- {}: {} stars", repo.name, repo.stars)?;
        }
        writeln!(f, "\nTop Forked Repositories:")?;
        for repo in &repos.top_forked {
            writeln!(f, "- {}: {} forks", repo.name, repo.forks)?;
        }
        writeln!(f, "\nMost Recent Activity:")?;
        for repo in &repos.recent_activity {
            writeln!(f, "- {}: last updated on {}", repo.name, repo.updated_at.format("%Y-%m-%d %H:%M:%S"))?;
        }
        writeln!(f, "\nLanguage Breakdown:")?;
        for (language, count) in &repos.language_breakdown {
            writeln!(f, "- {}: {}", language, count)?;
        }
        writeln!(f, "\nRepository Size Distribution (KB):")?;
        let max = repos.size_distribution.iter().map(|bin| bin.count).max().unwrap_or(0);
        for bin in &repos.size_distribution {
            writeln!(
                f,
                "{:>10.0} - {:<10.0} {:>4} {}",
                bin.lower,
                bin.upper,
                bin.count,
                bar(bin.count, max)
            )?;
        }
        Ok(())
    }
}

impl Display for CommitView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let commits = self.0;
        heading(f, "Commit Analysis Results")?;

        writeln!(f, "\nCommit Time Distribution:")?;
        let max = commits.time_distribution.iter().map(|(_, count)| *count).max().unwrap_or(0);
        for (day, count) in &commits.time_distribution {
            writeln!(f, "{:<4} {:>6} {}", day.to_string(), count, bar(*count, max))?;
        }
        writeln!(
            f,
            "\nAverage Commit Frequency: {:.2} commits per day",
            commits.average_frequency
        )?;
        writeln!(f, "Longest Commit Streak: {} days", commits.longest_streak)
    }
}

impl Display for PullRequestView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let pulls = self.0;
        heading(f, "Pull Request Analysis Results")?;

        writeln!(f, "\nTotal Pull Requests: {}", pulls.total)?;
        writeln!(f, "Opened Pull Requests: {}", pulls.stats.opened)?;
        writeln!(f, "Closed Pull Requests: {}", pulls.stats.closed)?;
        if pulls.total > 0 {
            let percentage = |count: usize| count as f64 / pulls.total as f64 * 100.0;
            writeln!(f, "\nOpen PR Percentage: {:.2}%", percentage(pulls.stats.opened))?;
            writeln!(f, "Closed PR Percentage: {:.2}%", percentage(pulls.stats.closed))?;
        }
        Ok(())
    }
}

impl Display for SummaryView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let analysis = self.0;
        let ContributorSummary {
            unique,
            repos_without,
            ..
        } = analysis.contributors;
        writeln!(f, "\nAnalysis Summary for {}:", analysis.owner)?;
        write!(f, "Total repositories: {}", analysis.repos.total)?;
        match analysis.reported_repo_count {
            Some(reported) if reported as usize != analysis.repos.total => {
                writeln!(f, " ({} public according to profile)", reported)?
            }
            _ => writeln!(f)?,
        }
        if !analysis.repos.complete {
            writeln!(f, "Repository listing is incomplete")?;
        }
        writeln!(f, "Processed repositories: {}", analysis.commits.tally.processed)?;
        writeln!(f, "Skipped repositories: {}", analysis.commits.tally.skipped)?;
        writeln!(f, "Total commits analyzed: {}", analysis.commits.total)?;
        writeln!(f, "Total unique contributors: {}", unique)?;
        writeln!(f, "Repositories without contributors: {}", repos_without)?;
        if analysis.contributors.tally.skipped > 0 {
            writeln!(
                f,
                "Repositories with unknown contributors: {}",
                analysis.contributors.tally.skipped
            )?;
        }
        writeln!(f, "Total pull requests opened: {}", analysis.pulls.stats.opened)?;
        writeln!(f, "Total pull requests closed: {}", analysis.pulls.stats.closed)?;
        if analysis.pulls.tally.skipped > 0 {
            writeln!(
                f,
                "Repositories with incomplete pull requests: {}",
                analysis.pulls.tally.skipped
            )?;
        }
        Ok(())
    }
}

impl Display for AnalysisReport<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let analysis = self.0;
        write!(f, "{}", RepoView(&analysis.repos))?;
        write!(f, "{}", CommitView(&analysis.commits))?;
        write!(f, "{}", PullRequestView(&analysis.pulls))?;
        write!(f, "{}", SummaryView(analysis))
    }
}

fn heading(f: &mut Formatter<'_>, title: &str) -> Result {
    writeln!(f, "\n{}:", title)?;
    writeln!(f, "{}", "=".repeat(title.len() + 1))
}

/// Horizontal bar scaled so that `max` spans the full width.
fn bar(count: usize, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    "#".repeat((count * BAR_WIDTH + max - 1) / max)
}

#[test]
fn bar_test() {
    assert_eq!(bar(0, 0), "");
    assert_eq!(bar(10, 10).len(), BAR_WIDTH);
    assert_eq!(bar(1, 1000).len(), 1, "Non zero counts stay visible");
    assert_eq!(bar(0, 10), "");
}

#[test]
fn pull_request_view_test() {
    use repo_insights::analyzer::Tally;
    use repo_insights::stats::PullRequestStats;

    let pulls = PullSummary {
        tally: Tally::default(),
        total: 4,
        stats: PullRequestStats::new(1, 3),
    };
    let view = PullRequestView(&pulls).to_string();
    assert!(view.contains("Total Pull Requests: 4"));
    assert!(view.contains("Open PR Percentage: 25.00%"));
    assert!(view.contains("Closed PR Percentage: 75.00%"));

    let none = PullSummary {
        total: 0,
        stats: PullRequestStats::default(),
        ..pulls
    };
    assert!(!PullRequestView(&none).to_string().contains("Percentage"));
}
