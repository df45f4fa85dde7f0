use chrono::Utc;
use derive_more::Constructor;
use log::debug;
use log::warn;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub const DEFAULT_THRESHOLD: u32 = 10;

/// Remaining requests and reset time (epoch seconds) of the most recent response.
#[derive(Constructor, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateBudget {
    pub remaining: u32,
    pub reset: i64,
}

impl RateBudget {
    /// Delay to apply before the next request, `None` while more than `threshold` requests remain
    /// or once the reset time has passed.
    pub fn time_to_wait(&self, threshold: u32, now_millis: i64) -> Option<Duration> {
        if self.remaining > threshold {
            return None;
        }
        let wait = self.reset.saturating_mul(1000).saturating_sub(now_millis);
        (wait > 0).then(|| Duration::from_millis(wait as u64))
    }
}

/// Budget handle shared by every client built with it. `None` until the first response arrives.
pub type SharedRateBudget = Arc<Mutex<Option<RateBudget>>>;

#[derive(Debug, Clone)]
pub struct RateLimitHeaders {
    pub remaining: String,
    pub reset: String,
}

impl Default for RateLimitHeaders {
    fn default() -> Self {
        RateLimitHeaders {
            remaining: "x-ratelimit-remaining".to_string(),
            reset: "x-ratelimit-reset".to_string(),
        }
    }
}

#[derive(Constructor, Clone)]
pub struct RateLimiter {
    budget: SharedRateBudget,
    threshold: u32,
    headers: RateLimitHeaders,
}

impl RateLimiter {
    /// Sleeps until the reset time when the budget is at or below the threshold. Returns the time slept.
    pub(crate) async fn wait(&self) -> Duration {
        match self.time_to_wait().await {
            Some(delay) => {
                warn!("Rate limit nearly exceeded. Waiting {} sec", delay.as_secs());
                tokio::time::sleep(delay).await;
                delay
            }
            None => Duration::ZERO,
        }
    }

    async fn time_to_wait(&self) -> Option<Duration> {
        let budget = *self.budget.lock().await;
        match budget {
            Some(budget) => {
                let delay = budget.time_to_wait(self.threshold, Utc::now().timestamp_millis());
                if delay.is_none() {
                    debug!("Remaining limit {}. Not waiting.", budget.remaining);
                }
                delay
            }
            None => None,
        }
    }

    /// Replaces the budget with the one announced by `headers`. Responses without both headers leave it untouched.
    pub(crate) async fn update(&self, headers: &HeaderMap<HeaderValue>) -> Option<RateBudget> {
        let remaining = read_header::<u32>(headers, &self.headers.remaining);
        let reset = read_header::<i64>(headers, &self.headers.reset);
        let mut budget = self.budget.lock().await;
        match (remaining, reset) {
            (Some(remaining), Some(reset)) => {
                *budget = Some(RateBudget::new(remaining, reset));
                debug!("Updated limits: {:?}", budget);
            }
            _ => debug!("No rate limit headers. Keeping {:?}", budget),
        }
        *budget
    }

    pub fn budget(&self) -> SharedRateBudget {
        self.budget.clone()
    }
}

fn read_header<T: FromStr>(headers: &HeaderMap<HeaderValue>, header: &str) -> Option<T> {
    let value = headers.get(header)?.to_str().ok()?;
    match value.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            debug!("Header {} has unexpected value {}", header, value);
            None
        }
    }
}

#[cfg(test)]
fn limiter(budget: Option<RateBudget>) -> RateLimiter {
    RateLimiter::new(Arc::new(Mutex::new(budget)), DEFAULT_THRESHOLD, RateLimitHeaders::default())
}

#[test]
fn time_to_wait_test() {
    let now = 1_700_000_000_000;
    let reset = now / 1000 + 30;
    assert_eq!(
        RateBudget::new(5, reset).time_to_wait(10, now),
        Some(Duration::from_secs(30))
    );
    assert_eq!(RateBudget::new(10, reset).time_to_wait(10, now), Some(Duration::from_secs(30)));
    assert_eq!(RateBudget::new(50, reset).time_to_wait(10, now), None, "Plenty of budget left");
    assert_eq!(
        RateBudget::new(0, now / 1000 - 5).time_to_wait(10, now),
        None,
        "Reset already passed"
    );
}

#[test]
fn far_reset_saturates_test() {
    let wait = RateBudget::new(0, i64::MAX).time_to_wait(10, 0);
    assert_eq!(wait, Some(Duration::from_millis(i64::MAX as u64)));
    let wait = RateBudget::new(0, i64::MAX / 10).time_to_wait(10, 1_700_000_000_000);
    assert!(wait.is_some());
    assert_eq!(RateBudget::new(0, i64::MIN).time_to_wait(10, 1_700_000_000_000), None);
}

#[tokio::test(start_paused = true)]
async fn wait_until_reset_test() {
    let reset = Utc::now().timestamp() + 30;
    let limiter = limiter(Some(RateBudget::new(5, reset)));
    let started = tokio::time::Instant::now();
    let slept = limiter.wait().await;
    let waited = started.elapsed();
    assert_eq!(slept, waited);
    assert!(
        waited > Duration::from_secs(28) && waited <= Duration::from_secs(30),
        "Limiter should wait until reset, waited {:?}",
        waited
    );
}

#[tokio::test(start_paused = true)]
async fn no_wait_with_budget_left_test() {
    let reset = Utc::now().timestamp() + 30;
    let limiter = limiter(Some(RateBudget::new(50, reset)));
    let started = tokio::time::Instant::now();
    limiter.wait().await;
    assert_eq!(started.elapsed(), Duration::ZERO);

    let unknown = self::limiter(None);
    unknown.wait().await;
    assert_eq!(started.elapsed(), Duration::ZERO, "Unknown budget should not delay");
}

#[tokio::test]
async fn update_from_headers_test() -> anyhow::Result<()> {
    let limiter = limiter(Some(RateBudget::new(3, 100)));

    let mut headers = HeaderMap::new();
    headers.insert("x-ratelimit-remaining", HeaderValue::from_str("4999")?);
    headers.insert("x-ratelimit-reset", HeaderValue::from_str("50")?);
    assert_eq!(
        limiter.update(&headers).await,
        Some(RateBudget::new(4999, 50)),
        "Latest response wins even with an older reset"
    );

    let mut partial = HeaderMap::new();
    partial.insert("x-ratelimit-remaining", HeaderValue::from_str("1")?);
    assert_eq!(limiter.update(&partial).await, Some(RateBudget::new(4999, 50)));

    let mut garbage = HeaderMap::new();
    garbage.insert("x-ratelimit-remaining", HeaderValue::from_str("many")?);
    garbage.insert("x-ratelimit-reset", HeaderValue::from_str("60")?);
    assert_eq!(limiter.update(&garbage).await, Some(RateBudget::new(4999, 50)));
    Ok(())
}
