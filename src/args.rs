use clap::Parser;
use secrecy::SecretString;
use std::{
    fmt::{Debug, Display},
    str::FromStr,
};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// Account whose repositories are analyzed
    #[clap(short, long, env = "GITHUB_USERNAME")]
    pub owner: String,

    /// API access token
    #[clap(short = 't', long, env = "GITHUB_TOKEN")]
    pub api_token: Option<SecretString>,

    /// Repository API URL
    #[clap(long, env, default_value = "https://api.github.com")]
    pub api_url: String,

    /// API version requested in the `Accept` media type
    #[clap(long, env, default_value = "v3")]
    pub api_version: String,

    /// Always fetch repository listings, even when a recent one is cached
    #[clap(long)]
    pub no_cache: bool,

    /// Seconds a cached repository listing stays valid
    #[clap(long, env, default_value_t = 300)]
    pub cache_ttl: u64,

    /// Maximal number of cached repository listings
    #[clap(long, env, default_value_t = 100)]
    pub cache_max_size: usize,

    /// Remaining requests at which to pause until the rate limit resets
    #[clap(long, env, default_value_t = 10)]
    pub rate_limit_threshold: u32,

    /// Maximal parallel repository requests, 1 fetches repositories one by one
    #[clap(long, env, default_value_t = 10, parse(try_from_str=max_parallel_req_in_range))]
    pub max_parallel_req: u32,

    /// Network timeout of a single request in seconds
    #[clap(long, env, default_value_t = 30, parse(try_from_str=timeout_in_range))]
    pub request_timeout: u64,

    /// Time budget of one paginated listing in seconds, unlimited if not set
    #[clap(long, env, parse(try_from_str=timeout_in_range))]
    pub query_timeout: Option<u64>,

    /// Length of the repository rankings
    #[clap(short = 'n', long, env, default_value_t = 5, parse(try_from_str=top_n_in_range))]
    pub top_n: usize,
}

fn max_parallel_req_in_range(value: &str) -> clap::Result<u32, String> {
    number_in_range(value, 1, 100, "max_parallel_req".to_string())
}

fn timeout_in_range(value: &str) -> clap::Result<u64, String> {
    number_in_range(value, 1, 3600, "timeout".to_string())
}

fn top_n_in_range(value: &str) -> clap::Result<usize, String> {
    number_in_range(value, 1, 100, "top_n".to_string())
}

fn number_in_range<T>(value: &str, min: T, max: T, name: String) -> clap::Result<T, String>
where
    T: FromStr + PartialOrd + Display,
    <T as FromStr>::Err: Display,
{
    value.parse::<T>().map_err(|err| format!("{}", err)).and_then(|value| {
        if value < min || value > max {
            return Err(format!("{} is not in range {} .. {}.", name, min, max));
        }
        Ok(value)
    })
}

#[test]
fn number_in_range_test() {
    assert_eq!(max_parallel_req_in_range("1"), Ok(1));
    assert_eq!(
        max_parallel_req_in_range("0"),
        Err("max_parallel_req is not in range 1 .. 100.".to_string())
    );
    assert!(top_n_in_range("five").is_err());
    assert_eq!(timeout_in_range("3600"), Ok(3600));
}

#[test]
fn defaults_test() {
    let args = Args::try_parse_from(["repo_insights", "--owner", "octo"]).unwrap();
    assert_eq!(args.owner, "octo");
    assert_eq!(args.api_url, "https://api.github.com");
    assert_eq!(args.cache_ttl, 300);
    assert_eq!(args.rate_limit_threshold, 10);
    assert_eq!(args.query_timeout, None);
    assert!(!args.no_cache);
}
