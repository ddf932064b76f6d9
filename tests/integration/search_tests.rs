//! End-to-end search runs against a mock archive API

use crate::fast_config;
use adlib_harvest::config::RunMode;
use adlib_harvest::crawler::Coordinator;
use adlib_harvest::output::{JsonLinesSink, RecordSink, RunStatus, SinkSet, SqliteSink};
use adlib_harvest::state::{PageOutcome, RunState};
use adlib_harvest::{Record, SourceTag};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ad(id: &str, page_name: &str) -> serde_json::Value {
    json!({
        "id": id,
        "page_id": "42",
        "page_name": page_name,
        "ad_creative_bodies": ["Fresh shoes for spring"],
        "ad_snapshot_url": format!("https://www.facebook.com/ads/archive/render_ad/?id={}", id),
        "impressions": {"lower_bound": "1000", "upper_bound": "1999"},
        "publisher_platforms": ["facebook", "instagram"]
    })
}

#[tokio::test]
async fn test_two_records_in_one_round() {
    let server = MockServer::start().await;
    let next = format!("{}/ads_archive?after=CURSOR1", server.uri());
    Mock::given(method("GET"))
        .and(path("/ads_archive"))
        .and(query_param("search_terms", "shoes"))
        .and(query_param("limit", "2"))
        .and(query_param("access_token", "test-token"))
        .and(query_param("ad_reached_countries", r#"["IT"]"#))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [ad("101", "Shoe Shop"), ad("102", "Boot Barn")],
            "paging": {"cursors": {"after": "CURSOR1"}, "next": next}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = fast_config(&server.uri());
    config.search.search_terms = Some("shoes".to_string());
    config.search.limit = 2;
    config.search.max_pages = 1;

    let coordinator = Coordinator::new(config, "hash").unwrap();
    let mut records: Vec<Record> = Vec::new();
    let summary = coordinator
        .run(RunMode::Search, &RunState::new(), &mut records)
        .await
        .unwrap();

    assert_eq!(summary.units, 1);
    assert_eq!(summary.records_emitted, 2);
    assert_eq!(summary.status, RunStatus::Completed);
    assert_eq!(records.len(), 2);

    let first = &records[0];
    assert_eq!(first.identity, "101");
    assert_eq!(first.source, SourceTag::Api);
    assert_eq!(first.text("ad_id"), Some("101"));
    assert_eq!(first.text("page_name"), Some("Shoe Shop"));
    assert_eq!(first.text("ad_creative_body"), Some("Fresh shoes for spring"));
    assert_eq!(first.text("ad_creative_link_title"), Some(""));
    assert_eq!(records[1].identity, "102");
}

#[tokio::test]
async fn test_token_chain_until_exhausted() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ads_archive"))
        .and(query_param("after", "CURSOR1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [ad("201", "Second")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let next = format!("{}/ads_archive?limit=2&after=CURSOR1", server.uri());
    Mock::given(method("GET"))
        .and(path("/ads_archive"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [ad("101", "First")],
            "paging": {"next": next}
        })))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    let mut config = fast_config(&server.uri());
    config.search.max_pages = 10;

    let coordinator = Coordinator::new(config, "hash").unwrap();
    let mut records: Vec<Record> = Vec::new();
    let summary = coordinator
        .run_search(&RunState::new(), &mut records)
        .await
        .unwrap();

    assert_eq!(summary.units, 2);
    let ids: Vec<&str> = records.iter().map(|r| r.identity.as_str()).collect();
    assert_eq!(ids, vec!["101", "201"]);
    assert_eq!(summary.stop_reason, "exhausted");
}

#[tokio::test]
async fn test_rate_limit_is_retried_without_advancing() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ads_archive"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/ads_archive"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [ad("301", "Retry Shop")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let coordinator = Coordinator::new(fast_config(&server.uri()), "hash").unwrap();
    let mut records: Vec<Record> = Vec::new();
    let summary = coordinator
        .run_search(&RunState::new(), &mut records)
        .await
        .unwrap();

    assert_eq!(summary.rate_limit_hits, 1);
    assert_eq!(summary.units, 1);
    assert_eq!(summary.outcomes.get(&PageOutcome::RateLimited), Some(&1));
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn test_empty_result_is_a_successful_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ads_archive"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(&server)
        .await;

    let coordinator = Coordinator::new(fast_config(&server.uri()), "hash").unwrap();
    let mut records: Vec<Record> = Vec::new();
    let summary = coordinator
        .run_search(&RunState::new(), &mut records)
        .await
        .unwrap();

    assert!(records.is_empty());
    assert_eq!(summary.status, RunStatus::Completed);
    assert_eq!(summary.units, 0);
}

#[tokio::test]
async fn test_records_reach_file_sinks() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ads_archive"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [ad("401", "A"), ad("402", "B"), ad("401", "A again")]
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let jsonl_path = dir.path().join("ads.jsonl");
    let db_path = dir.path().join("ads.db");

    let mut sinks = SinkSet::new();
    sinks.push(Box::new(JsonLinesSink::create(&jsonl_path).unwrap()));
    sinks.push(Box::new(SqliteSink::new(&db_path).unwrap()));

    let coordinator = Coordinator::new(fast_config(&server.uri()), "hash").unwrap();
    let summary = coordinator
        .run_search(&RunState::new(), &mut sinks as &mut dyn RecordSink)
        .await
        .unwrap();
    drop(sinks);

    assert_eq!(summary.records_emitted, 2);
    assert_eq!(summary.duplicates_dropped, 1);

    let content = std::fs::read_to_string(&jsonl_path).unwrap();
    let ids: Vec<String> = content
        .lines()
        .map(|line| serde_json::from_str::<Record>(line).unwrap().identity)
        .collect();
    assert_eq!(ids, vec!["401", "402"]);

    let db = SqliteSink::new(&db_path).unwrap();
    assert_eq!(db.identities(1).unwrap(), vec!["401", "402"]);
    assert_eq!(db.run_status(1).unwrap(), Some(RunStatus::Completed));
}
