use crate::cache::TtlCache;
use crate::cache::DEFAULT_MAX_ENTRIES;
use crate::cache::DEFAULT_TTL;
use crate::limiter::RateLimitHeaders;
use crate::limiter::RateLimiter;
use crate::limiter::SharedRateBudget;
use crate::limiter::DEFAULT_THRESHOLD;
use crate::GithubClient;
use repo_insights::api::Result;
use reqwest::header;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderName;
use reqwest::header::HeaderValue;
use reqwest::ClientBuilder;
use secrecy::ExposeSecret;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use url::Url;

pub struct GithubClientBuilder {
    client_builder: ClientBuilder,
    github_url: String,
    api_version: String,
    headers: HeaderMap,
    rate_limit_threshold: u32,
    rate_limit_headers: RateLimitHeaders,
    rate_budget: Option<SharedRateBudget>,
    cache: Option<(Duration, usize)>,
    query_timeout: Option<Duration>,
}

impl Default for GithubClientBuilder {
    fn default() -> Self {
        let mut headers = HeaderMap::default();
        headers.insert(header::USER_AGENT, HeaderValue::from_static("repo-insights"));
        Self {
            client_builder: ClientBuilder::default(),
            github_url: "https://api.github.com".to_string(),
            api_version: "v3".to_string(),
            headers,
            rate_limit_threshold: DEFAULT_THRESHOLD,
            rate_limit_headers: RateLimitHeaders::default(),
            rate_budget: None,
            cache: Some((DEFAULT_TTL, DEFAULT_MAX_ENTRIES)),
            query_timeout: None,
        }
    }
}

impl GithubClientBuilder {
    pub fn try_with_token(self, token: secrecy::SecretString) -> Result<GithubClientBuilder> {
        let bearer = format!("Bearer {}", token.expose_secret());
        Ok(self.try_with_header(header::AUTHORIZATION, bearer, true)?)
    }

    pub fn try_with_user_agent<STR: AsRef<str>>(self, user_agent: STR) -> Result<GithubClientBuilder> {
        Ok(self.try_with_header(header::USER_AGENT, user_agent, false)?)
    }

    pub fn with_github_url<STR: AsRef<str>>(mut self, url: STR) -> GithubClientBuilder {
        self.github_url = url.as_ref().to_string();
        self
    }

    /// Version segment of the `application/vnd.github.{version}+json` media type.
    pub fn with_api_version<STR: AsRef<str>>(mut self, version: STR) -> GithubClientBuilder {
        self.api_version = version.as_ref().to_string();
        self
    }

    /// Network timeout of every single request.
    pub fn with_request_timeout(mut self, timeout: Duration) -> GithubClientBuilder {
        self.client_builder = self.client_builder.timeout(timeout);
        self
    }

    /// Time budget of a whole paginated query. Pages not received in time end the query as partial.
    pub fn with_query_timeout(mut self, timeout: Duration) -> GithubClientBuilder {
        self.query_timeout = Some(timeout);
        self
    }

    /// Requests are delayed until reset once the remaining budget drops to `threshold` or below.
    pub fn with_rate_limit_threshold(mut self, threshold: u32) -> GithubClientBuilder {
        self.rate_limit_threshold = threshold;
        self
    }

    pub fn with_rate_limit_headers<STR: AsRef<str>>(mut self, remaining: STR, reset: STR) -> GithubClientBuilder {
        self.rate_limit_headers = RateLimitHeaders {
            remaining: remaining.as_ref().to_ascii_lowercase(),
            reset: reset.as_ref().to_ascii_lowercase(),
        };
        self
    }

    /// Shares one budget between clients using the same token.
    pub fn with_rate_budget(mut self, budget: SharedRateBudget) -> GithubClientBuilder {
        self.rate_budget = Some(budget);
        self
    }

    pub fn with_cache(mut self, ttl: Duration, max_entries: usize) -> GithubClientBuilder {
        self.cache = Some((ttl, max_entries));
        self
    }

    pub fn without_cache(mut self) -> GithubClientBuilder {
        self.cache = None;
        self
    }

    fn try_with_header(
        mut self,
        key: HeaderName,
        val: impl AsRef<str>,
        sensitive: bool,
    ) -> anyhow::Result<GithubClientBuilder> {
        let mut val = HeaderValue::from_str(val.as_ref())?;
        val.set_sensitive(sensitive);
        self.headers.insert(key, val);
        Ok(self)
    }

    pub fn build(self) -> Result<GithubClient> {
        let accept = format!("application/vnd.github.{}+json", self.api_version);
        let builder = self.try_with_header(header::ACCEPT, accept, false)?;
        let github_url = Url::parse(&builder.github_url).map_err(anyhow::Error::from)?;
        let client = builder.client_builder.default_headers(builder.headers).build()?;
        let budget = builder.rate_budget.unwrap_or_else(|| Arc::new(Mutex::new(None)));
        let limiter = RateLimiter::new(budget, builder.rate_limit_threshold, builder.rate_limit_headers);
        let cache = builder
            .cache
            .map(|(ttl, max_entries)| Mutex::new(TtlCache::new(ttl, max_entries)));
        Ok(GithubClient {
            client,
            github_url,
            limiter,
            cache,
            query_timeout: builder.query_timeout,
        })
    }
}
