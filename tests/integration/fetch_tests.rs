//! Outcome classification of the HTTP fetcher against a live mock server

use adlib_harvest::config::FetchConfig;
use adlib_harvest::crawler::{FetchFailure, FetchOutcome, FetchRequest, Fetcher, HttpFetcher};
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher(timeout_secs: u64) -> HttpFetcher {
    let config = FetchConfig {
        timeout_secs,
        ..FetchConfig::default()
    };
    HttpFetcher::new(&config).unwrap()
}

fn endpoint(server: &MockServer, p: &str) -> Url {
    Url::parse(&format!("{}{}", server.uri(), p)).unwrap()
}

#[tokio::test]
async fn test_success_carries_body_and_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ads_archive"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(r#"{"data":[]}"#, "application/json"))
        .expect(1)
        .mount(&server)
        .await;

    let request = FetchRequest::json(
        endpoint(&server, "/ads_archive"),
        vec![("limit".to_string(), "2".to_string())],
    );
    match fetcher(5).fetch(&request).await {
        FetchOutcome::Success {
            status,
            body,
            content_type,
            ..
        } => {
            assert_eq!(status, 200);
            assert_eq!(body, r#"{"data":[]}"#);
            assert!(content_type.starts_with("application/json"));
        }
        other => panic!("expected success, got {:?}", other),
    }
}

#[tokio::test]
async fn test_429_is_rate_limited_with_hint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
        .mount(&server)
        .await;

    let request = FetchRequest::json(endpoint(&server, "/ads_archive"), vec![]);
    match fetcher(5).fetch(&request).await {
        FetchOutcome::RateLimited { retry_after } => {
            assert_eq!(retry_after, Some(Duration::from_secs(7)));
        }
        other => panic!("expected rate limit, got {:?}", other),
    }
}

#[tokio::test]
async fn test_throttle_code_in_400_is_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(400).set_body_raw(
            r#"{"error":{"message":"User request limit reached","code":17}}"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let request = FetchRequest::json(endpoint(&server, "/ads_archive"), vec![]);
    let outcome = fetcher(5).fetch(&request).await;
    assert!(matches!(outcome, FetchOutcome::RateLimited { retry_after: None }));
}

#[tokio::test]
async fn test_bad_request_is_fatal_with_api_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(400).set_body_raw(
            r#"{"error":{"message":"Invalid parameter","code":100}}"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let request = FetchRequest::json(endpoint(&server, "/ads_archive"), vec![]);
    match fetcher(5).fetch(&request).await {
        FetchOutcome::FatalError { cause } => assert_eq!(
            cause,
            FetchFailure::ClientError {
                status: 400,
                message: "Invalid parameter".to_string()
            }
        ),
        other => panic!("expected fatal error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let request = FetchRequest::html(endpoint(&server, "/listing"));
    match fetcher(5).fetch(&request).await {
        FetchOutcome::TransientError { cause } => {
            assert_eq!(cause, FetchFailure::ServerError(503))
        }
        other => panic!("expected transient error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_non_html_page_is_content_mismatch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/report.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("%PDF-1.4", "application/pdf"))
        .mount(&server)
        .await;

    let request = FetchRequest::html(endpoint(&server, "/report.pdf"));
    match fetcher(5).fetch(&request).await {
        FetchOutcome::FatalError {
            cause: FetchFailure::UnsupportedContent(content_type),
        } => assert_eq!(content_type, "application/pdf"),
        other => panic!("expected content mismatch, got {:?}", other),
    }
}

#[tokio::test]
async fn test_slow_response_is_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<html></html>", "text/html")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let request = FetchRequest::html(endpoint(&server, "/slow"));
    let outcome = fetcher(1).fetch(&request).await;
    assert!(matches!(
        outcome,
        FetchOutcome::TransientError {
            cause: FetchFailure::Timeout
        }
    ));
}

#[tokio::test]
async fn test_refused_connection_is_transient() {
    let request = FetchRequest::html(Url::parse("http://127.0.0.1:1/").unwrap());
    let outcome = fetcher(2).fetch(&request).await;
    assert!(matches!(outcome, FetchOutcome::TransientError { .. }));
}
