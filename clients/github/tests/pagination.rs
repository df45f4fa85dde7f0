use github::GithubClientBuilder;
use repo_insights::api::{Client, Collection, Error, PullState, Query, PAGE_SIZE};
use repo_insights_github_client as github;
use secrecy::SecretString;
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn commits_body(page: u32, count: u32) -> Value {
    let commits: Vec<Value> = (0..count)
        .map(|i| {
            json!({
                "sha": format!("sha_{}_{}", page, i),
                "commit": {
                    "author": { "name": "octo", "date": "2024-01-01T10:00:00Z" },
                    "message": "change"
                }
            })
        })
        .collect();
    Value::Array(commits)
}

fn repos_body(count: u32) -> Value {
    let repos: Vec<Value> = (0..count)
        .map(|i| {
            json!({
                "name": format!("repo_{}", i),
                "owner": { "login": "octo" },
                "stargazers_count": i,
                "forks_count": 0,
                "language": null,
                "size": 10,
                "updated_at": "2024-01-01T10:00:00Z"
            })
        })
        .collect();
    Value::Array(repos)
}

async fn mock_page(server: &MockServer, route: &str, page: u32, response: ResponseTemplate, times: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .and(query_param("page", page.to_string()))
        .and(query_param("per_page", PAGE_SIZE.to_string()))
        .respond_with(response)
        .expect(times)
        .mount(server)
        .await;
}

fn client(server: &MockServer) -> github::GithubClient {
    GithubClientBuilder::default()
        .with_github_url(server.uri())
        .build()
        .unwrap()
}

#[tokio::test]
async fn short_page_ends_pagination_test() {
    let server = MockServer::start().await;
    let route = "/repos/octo/demo/commits";
    for (page, count) in [(1, 100), (2, 100), (3, 37)] {
        let response = ResponseTemplate::new(200).set_body_json(commits_body(page, count));
        mock_page(&server, route, page, response, 1).await;
    }
    mock_page(&server, route, 4, ResponseTemplate::new(200).set_body_json(json!([])), 0).await;

    let commits = client(&server).repo_commits("octo", "demo").await;

    assert!(commits.is_complete());
    assert_eq!(commits.len(), 237);
    let order: Vec<String> = commits.items().iter().map(|c| c.sha.clone()).collect();
    assert_eq!(order[0], "sha_1_0");
    assert_eq!(order[99], "sha_1_99");
    assert_eq!(order[100], "sha_2_0");
    assert_eq!(order[236], "sha_3_36");
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn exact_multiple_costs_one_empty_request_test() {
    let server = MockServer::start().await;
    let route = "/repos/octo/demo/commits";
    for page in 1..=2 {
        let response = ResponseTemplate::new(200).set_body_json(commits_body(page, 100));
        mock_page(&server, route, page, response, 1).await;
    }
    mock_page(&server, route, 3, ResponseTemplate::new(200).set_body_json(json!([])), 1).await;

    let commits = client(&server).fetch::<Value>(&Query::commits("octo", "demo")).await;

    assert!(commits.is_complete());
    assert_eq!(commits.len(), 200);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn conflict_keeps_earlier_pages_test() {
    let server = MockServer::start().await;
    let route = "/repos/octo/moved/commits";
    let response = ResponseTemplate::new(200).set_body_json(commits_body(1, 100));
    mock_page(&server, route, 1, response, 1).await;
    mock_page(&server, route, 2, ResponseTemplate::new(409), 1).await;

    let commits = client(&server).repo_commits("octo", "moved").await;

    assert!(commits.is_complete(), "409 is not an error");
    assert_eq!(commits.len(), 100);
}

#[tokio::test]
async fn no_content_is_an_empty_success_test() {
    let server = MockServer::start().await;
    let route = "/repos/octo/empty-repo/contributors";
    mock_page(&server, route, 1, ResponseTemplate::new(204), 1).await;

    let contributors = client(&server).repo_contributors("octo", "empty-repo").await;

    assert!(contributors.is_complete());
    assert!(contributors.is_empty());
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn failure_returns_partial_collection_test() {
    let server = MockServer::start().await;
    let route = "/repos/octo/flaky/commits";
    let response = ResponseTemplate::new(200).set_body_json(commits_body(1, 100));
    mock_page(&server, route, 1, response, 1).await;
    mock_page(&server, route, 2, ResponseTemplate::new(502), 1).await;
    mock_page(&server, route, 3, ResponseTemplate::new(200).set_body_json(json!([])), 0).await;

    let commits = client(&server).repo_commits("octo", "flaky").await;

    match commits {
        Collection::Partial { items, cause } => {
            assert_eq!(items.len(), 100);
            assert!(matches!(cause, Error::Status { status: 502, .. }));
        }
        Collection::Complete(_) => panic!("502 should not produce a complete collection"),
    }
}

#[tokio::test]
async fn exhausted_budget_is_rate_limited_test() {
    let server = MockServer::start().await;
    let response = ResponseTemplate::new(403)
        .insert_header("x-ratelimit-remaining", "0")
        .insert_header("x-ratelimit-reset", "1");
    mock_page(&server, "/repos/octo/demo/contributors", 1, response, 1).await;

    let contributors = client(&server).repo_contributors("octo", "demo").await;

    assert!(matches!(contributors.cause(), Some(Error::RateLimited { reset: 1 })));
    assert!(contributors.is_empty());
}

#[tokio::test]
async fn pull_requests_filter_by_state_test() {
    let server = MockServer::start().await;
    let body = json!([{
        "number": 7,
        "title": "Add feature",
        "state": "closed",
        "created_at": "2024-01-01T10:00:00Z",
        "closed_at": "2024-01-02T10:00:00Z"
    }]);
    Mock::given(method("GET"))
        .and(path("/repos/octo/demo/pulls"))
        .and(query_param("state", "all"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(&server)
        .await;

    let pulls = client(&server).repo_pull_requests("octo", "demo", PullState::All).await;

    assert!(pulls.is_complete());
    assert_eq!(pulls.items()[0].number, 7);
    assert!(pulls.items()[0].closed_at.is_some());
}

#[tokio::test]
async fn repositories_are_cached_test() {
    let server = MockServer::start().await;
    let response = ResponseTemplate::new(200).set_body_json(repos_body(3));
    mock_page(&server, "/users/octo/repos", 1, response, 1).await;

    let client = client(&server);
    let first = client.user_repos("octo").await;
    let second = client.user_repos("octo").await;

    assert_eq!(first.items(), second.items());
    assert_eq!(second.len(), 3);
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn repositories_without_cache_are_fetched_again_test() {
    let server = MockServer::start().await;
    let response = ResponseTemplate::new(200).set_body_json(repos_body(3));
    mock_page(&server, "/users/octo/repos", 1, response, 2).await;

    let client = GithubClientBuilder::default()
        .with_github_url(server.uri())
        .without_cache()
        .build()
        .unwrap();
    client.fetch_cached("octo").await;
    client.fetch_cached("octo").await;

    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn partial_repositories_are_not_cached_test() {
    let server = MockServer::start().await;
    mock_page(&server, "/users/octo/repos", 1, ResponseTemplate::new(500), 2).await;

    let client = client(&server);
    assert!(!client.user_repos("octo").await.is_complete());
    assert!(!client.user_repos("octo").await.is_complete());
}

#[tokio::test]
async fn slow_query_times_out_with_partial_collection_test() {
    let server = MockServer::start().await;
    let route = "/repos/octo/slow/commits";
    let response = ResponseTemplate::new(200).set_body_json(commits_body(1, 100));
    mock_page(&server, route, 1, response, 1).await;
    let slow = ResponseTemplate::new(200)
        .set_body_json(commits_body(2, 10))
        .set_delay(Duration::from_secs(5));
    mock_page(&server, route, 2, slow, 1).await;

    let client = GithubClientBuilder::default()
        .with_github_url(server.uri())
        .with_query_timeout(Duration::from_millis(500))
        .build()
        .unwrap();
    let commits = client.repo_commits("octo", "slow").await;

    assert_eq!(commits.len(), 100);
    assert!(matches!(commits.cause(), Some(Error::Timeout(_))));
}

#[tokio::test]
async fn headers_and_budget_test() {
    let server = MockServer::start().await;
    let response = ResponseTemplate::new(200)
        .set_body_json(json!({ "login": "octo", "public_repos": 42 }))
        .insert_header("x-ratelimit-remaining", "4999")
        .insert_header("x-ratelimit-reset", "1700000000");
    Mock::given(method("GET"))
        .and(path("/users/octo"))
        .and(header("Accept", "application/vnd.github.v3+json"))
        .and(header("Authorization", "Bearer secret"))
        .respond_with(response)
        .expect(1)
        .mount(&server)
        .await;

    let client = GithubClientBuilder::default()
        .with_github_url(server.uri())
        .try_with_token(SecretString::new("secret".to_string()))
        .unwrap()
        .build()
        .unwrap();

    assert_eq!(client.user_repo_count("octo").await.unwrap(), 42);
    let budget = *client.rate_budget().lock().await;
    assert_eq!(budget, Some(github::RateBudget::new(4999, 1_700_000_000)));
}

fn first_page_with_budget(remaining: u32, reset: i64) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_json(commits_body(1, 100))
        .insert_header("x-ratelimit-remaining", remaining.to_string().as_str())
        .insert_header("x-ratelimit-reset", reset.to_string().as_str())
}

#[tokio::test]
async fn low_budget_delays_next_page_until_reset_test() {
    let server = MockServer::start().await;
    let route = "/repos/octo/busy/commits";
    let reset = chrono::Utc::now().timestamp() + 2;
    mock_page(&server, route, 1, first_page_with_budget(5, reset), 1).await;
    let response = ResponseTemplate::new(200).set_body_json(commits_body(2, 10));
    mock_page(&server, route, 2, response, 1).await;

    let started = std::time::Instant::now();
    let commits = client(&server).repo_commits("octo", "busy").await;
    let elapsed = started.elapsed();

    assert!(commits.is_complete());
    assert_eq!(commits.len(), 110);
    assert!(
        chrono::Utc::now().timestamp() >= reset,
        "Page 2 should be requested after the reset"
    );
    assert!(elapsed >= Duration::from_secs(1), "Waited only {:?}", elapsed);
}

#[tokio::test]
async fn budget_above_threshold_does_not_delay_test() {
    let server = MockServer::start().await;
    let route = "/repos/octo/idle/commits";
    let reset = chrono::Utc::now().timestamp() + 30;
    mock_page(&server, route, 1, first_page_with_budget(50, reset), 1).await;
    let response = ResponseTemplate::new(200).set_body_json(commits_body(2, 10));
    mock_page(&server, route, 2, response, 1).await;

    let started = std::time::Instant::now();
    let commits = client(&server).repo_commits("octo", "idle").await;

    assert_eq!(commits.len(), 110);
    assert!(started.elapsed() < Duration::from_secs(5), "No delay expected");
}

#[tokio::test]
async fn rate_limit_pause_does_not_count_against_query_timeout_test() {
    let server = MockServer::start().await;
    let route = "/repos/octo/paced/commits";
    let reset = chrono::Utc::now().timestamp() + 2;
    mock_page(&server, route, 1, first_page_with_budget(1, reset), 1).await;
    let response = ResponseTemplate::new(200).set_body_json(commits_body(2, 10));
    mock_page(&server, route, 2, response, 1).await;

    let client = GithubClientBuilder::default()
        .with_github_url(server.uri())
        .with_query_timeout(Duration::from_millis(500))
        .build()
        .unwrap();
    let commits = client.repo_commits("octo", "paced").await;

    assert!(commits.is_complete(), "Pause ended as {:?}", commits.cause());
    assert_eq!(commits.len(), 110);
}
