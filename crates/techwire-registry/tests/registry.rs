//! Integration tests for the registry collectors against a local mock
//! server.

// `cargo verify` runs clippy with `-D warnings` for all targets, including tests.
#![allow(clippy::unwrap_used)]

use chrono::{DateTime, Utc};
use serde_json::json;
use techwire::{Collector, RegistryKind, RegistryRef, SourceKind};
use techwire_registry::RegistryCollector;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn cutoff(ts: &str) -> DateTime<Utc> {
    ts.parse().unwrap()
}

fn collector(server: &MockServer, entries: Vec<RegistryRef>) -> RegistryCollector {
    RegistryCollector::new(entries, cutoff("2026-02-01T00:00:00Z"), 2)
        .unwrap()
        .with_bases(server.uri(), server.uri())
}

#[tokio::test]
async fn npm_package_within_cutoff_becomes_release_item() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/react"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "dist-tags": {"latest": "19.0.0"},
            "time": {"19.0.0": "2026-02-12T00:00:00Z", "18.0.0": "2024-01-01T00:00:00Z"},
            "description": "UI library"
        })))
        .mount(&server)
        .await;

    let items = collector(
        &server,
        vec![RegistryRef { kind: RegistryKind::Npm, name: "react".into() }],
    )
    .collect()
    .await
    .unwrap();

    assert_eq!(items.len(), 1);
    let item = &items[0];
    assert_eq!(item.title, "react v19.0.0 released");
    assert_eq!(item.url, "https://www.npmjs.com/package/react");
    assert_eq!(item.source_label, "npm");
    assert_eq!(item.kind, SourceKind::Registry);
    assert!(item.body.contains("UI library"));
}

#[tokio::test]
async fn rubygems_latest_version_is_first_row() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/versions/rails.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"number": "7.2.0", "created_at": "2026-02-10T00:00:00Z", "summary": "web framework"},
            {"number": "7.1.0", "created_at": "2025-10-01T00:00:00Z"}
        ])))
        .mount(&server)
        .await;

    let items = collector(
        &server,
        vec![RegistryRef { kind: RegistryKind::Rubygems, name: "rails".into() }],
    )
    .collect()
    .await
    .unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, "rails v7.2.0 released");
    assert_eq!(items[0].source_label, "RubyGems");
    assert_eq!(
        items[0].url,
        "https://rubygems.org/gems/rails/versions/7.2.0"
    );
}

#[tokio::test]
async fn stale_versions_are_filtered_by_cutoff() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/lodash"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "dist-tags": {"latest": "4.17.21"},
            "time": {"4.17.21": "2021-02-20T00:00:00Z"}
        })))
        .mount(&server)
        .await;

    let items = collector(
        &server,
        vec![RegistryRef { kind: RegistryKind::Npm, name: "lodash".into() }],
    )
    .collect()
    .await
    .unwrap();
    assert!(items.is_empty());
}

#[tokio::test]
async fn unknown_packages_and_failures_do_not_break_siblings() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ghost-package"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/versions/broken.json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/react"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "dist-tags": {"latest": "19.0.0"},
            "time": {"19.0.0": "2026-02-12T00:00:00Z"}
        })))
        .mount(&server)
        .await;

    let items = collector(
        &server,
        vec![
            RegistryRef { kind: RegistryKind::Npm, name: "ghost-package".into() },
            RegistryRef { kind: RegistryKind::Rubygems, name: "broken".into() },
            RegistryRef { kind: RegistryKind::Npm, name: "react".into() },
        ],
    )
    .collect()
    .await
    .unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, "react v19.0.0 released");
}
