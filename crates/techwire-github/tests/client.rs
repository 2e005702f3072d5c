//! Integration tests for the rate-limit-aware client against a local mock
//! server.

// `cargo verify` runs clippy with `-D warnings` for all targets, including tests.
#![allow(clippy::unwrap_used)]

use std::time::Instant;

use serde_json::{json, Value};
use techwire_github::{GithubClient, GithubError};
use wiremock::matchers::{header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn client(server: &MockServer, token: Option<&str>) -> GithubClient {
    GithubClient::builder()
        .api_base(server.uri())
        .token(token.map(str::to_string))
        .build()
        .unwrap()
}

#[tokio::test]
async fn success_returns_parsed_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/o/r"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1})))
        .mount(&server)
        .await;

    let value = client(&server, None).get_json("/repos/o/r", &[]).await.unwrap();
    assert_eq!(value["id"], 1);
}

#[tokio::test]
async fn token_is_sent_as_bearer_auth() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let c = client(&server, Some("secret-token"));
    assert!(c.token_present());
    c.get_json("/user", &[]).await.unwrap();
}

#[tokio::test]
async fn rate_limit_recovery_honors_retry_after() {
    // Seed scenario S3: two 429s with Retry-After: 1, then success.
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/o/r/releases"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "1")
                .set_body_string("slow down"),
        )
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/o/r/releases"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .expect(1)
        .mount(&server)
        .await;

    let started = Instant::now();
    let value = client(&server, None)
        .get_json("/repos/o/r/releases", &[])
        .await
        .unwrap();
    assert!(value.is_array());
    // Two waits of >= 1s each.
    assert!(started.elapsed().as_millis() >= 2_000);
}

#[tokio::test]
async fn rate_limit_budget_is_four_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/o/r"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "1")
                .insert_header("x-ratelimit-remaining", "0"),
        )
        .expect(5)
        .mount(&server)
        .await;

    let err = client(&server, None).get_json("/repos/o/r", &[]).await.unwrap_err();
    assert!(matches!(err, GithubError::RateLimited { retries: 4, .. }));
}

#[tokio::test]
async fn forbidden_with_rate_limit_phrase_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/o/r"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("retry-after", "1")
                .set_body_string("You have exceeded a secondary rate limit."),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/o/r"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let value = client(&server, None).get_json("/repos/o/r", &[]).await.unwrap();
    assert_eq!(value["ok"], true);
}

#[tokio::test]
async fn plain_forbidden_is_an_auth_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/o/r"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Must have admin rights"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server, None).get_json("/repos/o/r", &[]).await.unwrap_err();
    assert!(matches!(err, GithubError::Auth { status: 403, .. }));
}

#[tokio::test]
async fn not_found_propagates_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/o/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server, None).get_json("/repos/o/missing", &[]).await.unwrap_err();
    assert!(matches!(err, GithubError::NotFound { .. }));
}

#[tokio::test]
async fn other_client_errors_propagate_immediately() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/o/r"))
        .respond_with(ResponseTemplate::new(422).set_body_string("Validation Failed"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server, None).get_json("/repos/o/r", &[]).await.unwrap_err();
    assert!(matches!(err, GithubError::Status { status: 422, .. }));
}

#[tokio::test]
async fn pagination_stops_on_first_short_page() {
    let server = MockServer::start().await;
    let full_page: Vec<Value> = (0..100).map(|i| json!({"id": i})).collect();
    let short_page: Vec<Value> = (100..130).map(|i| json!({"id": i})).collect();

    Mock::given(method("GET"))
        .and(path("/repos/o/r/issues"))
        .and(query_param("page", "1"))
        .and(query_param("per_page", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&full_page))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/o/r/issues"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&short_page))
        .expect(1)
        .mount(&server)
        .await;

    let rows = client(&server, Some("t"))
        .get_paginated("/repos/o/r/issues", &[])
        .await
        .unwrap();
    assert_eq!(rows.len(), 130);
    assert_eq!(rows[129]["id"], 129);
}

#[tokio::test]
async fn pagination_stops_on_empty_first_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/o/r/issues"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let rows = client(&server, Some("t"))
        .get_paginated("/repos/o/r/issues", &[])
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn capped_fetch_issues_one_request_with_page_size() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/o/r/releases"))
        .and(query_param("per_page", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}, {"id": 2}])))
        .expect(1)
        .mount(&server)
        .await;

    let rows = client(&server, None)
        .get_capped("/repos/o/r/releases", &[], 10)
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);

    let requests: Vec<Request> = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
}

#[tokio::test]
async fn non_array_payload_is_a_parse_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/o/r/releases"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "nope"})))
        .mount(&server)
        .await;

    let err = client(&server, None)
        .get_capped("/repos/o/r/releases", &[], 10)
        .await
        .unwrap_err();
    assert!(matches!(err, GithubError::Parse { .. }));
}
