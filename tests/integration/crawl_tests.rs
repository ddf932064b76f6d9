//! End-to-end crawl runs against mock listing pages

use crate::fast_config;
use adlib_harvest::config::RunMode;
use adlib_harvest::crawler::Coordinator;
use adlib_harvest::output::RunStatus;
use adlib_harvest::state::{PageOutcome, RunState};
use adlib_harvest::{Record, SourceTag};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn listing(ad_id: &str, advertiser: &str, link: &str) -> String {
    format!(
        r#"<html><body>
            <div data-ad-id="{ad_id}">
                <h3>{advertiser}</h3>
                <span>Started running on Mar 4, 2024</span>
                <p>Handmade leather boots, shipped anywhere in Europe within days.</p>
            </div>
            <a href="{link}">More ads</a>
        </body></html>"#
    )
}

async fn mount_html(server: &MockServer, p: &str, body: String, expected: u64) {
    Mock::given(method("GET"))
        .and(path(p))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html"))
        .expect(expected)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_single_page_mode() {
    let server = MockServer::start().await;
    mount_html(&server, "/listing", listing("9001", "Boot Barn", "/second"), 1).await;
    mount_html(&server, "/second", listing("9002", "Other", "/listing"), 0).await;

    let mut config = fast_config(&server.uri());
    config.crawl.seeds = vec![format!("{}/listing", server.uri())];
    config.crawl.max_depth = 1;

    let coordinator = Coordinator::new(config, "hash").unwrap();
    let mut records: Vec<Record> = Vec::new();
    let summary = coordinator
        .run(RunMode::Crawl, &RunState::new(), &mut records)
        .await
        .unwrap();

    assert_eq!(summary.units, 1);
    assert_eq!(summary.status, RunStatus::Completed);
    assert_eq!(records.len(), 1);

    let record = &records[0];
    assert_eq!(record.identity, "9001");
    assert_eq!(record.source, SourceTag::Heuristic);
    assert_eq!(record.text("page_name"), Some("Boot Barn"));
    assert_eq!(
        record.text("source_url"),
        Some(format!("{}/listing", server.uri()).as_str())
    );
}

#[tokio::test]
async fn test_cycle_is_visited_once() {
    let server = MockServer::start().await;
    mount_html(&server, "/a", listing("1", "Alpha Ads", "/b"), 1).await;
    mount_html(&server, "/b", listing("2", "Beta Ads", "/a"), 1).await;

    let mut config = fast_config(&server.uri());
    config.crawl.seeds = vec![format!("{}/a", server.uri())];
    config.crawl.max_depth = 3;
    config.crawl.concurrency = 2;

    let coordinator = Coordinator::new(config, "hash").unwrap();
    let mut records: Vec<Record> = Vec::new();
    let summary = coordinator
        .run_crawl(&RunState::new(), &mut records)
        .await
        .unwrap();

    assert_eq!(summary.units, 2);
    let mut ids: Vec<&str> = records.iter().map(|r| r.identity.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["1", "2"]);
}

#[tokio::test]
async fn test_non_html_seed_is_skipped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(r#"{"ads":[]}"#, "application/json"))
        .expect(1)
        .mount(&server)
        .await;
    mount_html(&server, "/listing", listing("77", "Shop", "/feed"), 1).await;

    let mut config = fast_config(&server.uri());
    config.crawl.seeds = vec![
        format!("{}/feed", server.uri()),
        format!("{}/listing", server.uri()),
    ];
    config.crawl.max_depth = 1;

    let coordinator = Coordinator::new(config, "hash").unwrap();
    let mut records: Vec<Record> = Vec::new();
    let summary = coordinator
        .run_crawl(&RunState::new(), &mut records)
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(summary.outcomes.get(&PageOutcome::ContentMismatch), Some(&1));
    assert_eq!(summary.outcomes.get(&PageOutcome::Extracted), Some(&1));
}
