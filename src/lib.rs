pub mod args;
pub mod report;

use github_client::GithubClientBuilder;
use log::info;
use repo_insights::api::Result;
use repo_insights::{Analysis, Analyzer};
use std::time::Duration;

pub use args::Args;

pub async fn analyze(args: Args) -> Result<Analysis> {
    let mut client = GithubClientBuilder::default()
        .with_github_url(&args.api_url)
        .with_api_version(&args.api_version)
        .with_rate_limit_threshold(args.rate_limit_threshold)
        .with_request_timeout(Duration::from_secs(args.request_timeout));
    client = if args.no_cache {
        client.without_cache()
    } else {
        client.with_cache(Duration::from_secs(args.cache_ttl), args.cache_max_size)
    };
    if let Some(timeout) = args.query_timeout {
        client = client.with_query_timeout(Duration::from_secs(timeout));
    }
    if let Some(token) = args.api_token {
        client = client.try_with_token(token)?;
    }
    let client = client.build()?;

    info!("Analyzing repositories of {}", args.owner);
    let analyzer = Analyzer::new(client, args.max_parallel_req as usize, args.top_n);
    analyzer.analyze(&args.owner).await
}
