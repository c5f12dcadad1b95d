//! End-to-end tests of the HTTP surface against a mocked FitX API.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fitx_utilization_proxy::server::router;
use fitx_utilization_proxy::store::{Store, StoreConfig};
use fitx_utilization_proxy::upstream::{FitxClient, UpstreamConfig};

const STUDIOS_PATH: &str = "/sponsorship/v1/public/studios/forwhitelabelportal";

struct Harness {
    server: TestServer,
    upstream: MockServer,
    _static_dir: TempDir,
}

fn static_dir() -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp directory");
    fs::write(
        dir.path().join("index.html"),
        "<!DOCTYPE html><html><body>studio finder</body></html>",
    )
    .unwrap();
    fs::write(dir.path().join("app.js"), "console.log('hello');").unwrap();
    dir
}

async fn mount_directory(upstream: &MockServer) {
    Mock::given(method("GET"))
        .and(path(STUDIOS_PATH))
        .and(header("x-tenant", "fitx"))
        .and(header("x-public-facility-group", "group-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [
                {
                    "id": 5,
                    "magiclineId": 100,
                    "name": "Berlin-Mitte",
                    "uuid": "uuid-5",
                    "address": {"latitude": 52.52, "longitude": 13.405}
                },
                {
                    "id": 6,
                    "magiclineId": 101,
                    "name": "Hamburg-Altona",
                    "uuid": "uuid-6",
                    "address": {"latitude": 53.5511, "longitude": 9.9937}
                }
            ]
        })))
        .mount(upstream)
        .await;
}

async fn harness(upstream: MockServer) -> Harness {
    let config = UpstreamConfig::new("group-1")
        .with_base_url(upstream.uri())
        .with_timeout(Duration::from_secs(1));
    let client = FitxClient::new(config).unwrap();
    let store = Arc::new(Store::new(client, StoreConfig::default()).await);

    let static_dir = static_dir();
    let app = router(store, static_dir.path());

    Harness {
        server: TestServer::new(app).unwrap(),
        upstream,
        _static_dir: static_dir,
    }
}

#[tokio::test]
async fn test_unparsable_studio_id_is_not_found() {
    let upstream = MockServer::start().await;
    mount_directory(&upstream).await;
    let h = harness(upstream).await;

    let response = h.server.get("/api/utilization/abc").await;

    response.assert_status(StatusCode::NOT_FOUND);
    response.assert_json(&json!({"message": "could not parse studio id"}));
}

#[tokio::test]
async fn test_unknown_studio_is_not_found() {
    let upstream = MockServer::start().await;
    mount_directory(&upstream).await;
    let h = harness(upstream).await;

    let response = h.server.get("/api/utilization/999999").await;

    response.assert_status(StatusCode::NOT_FOUND);
    response.assert_json(&json!({"message": "studio not found"}));
}

#[tokio::test]
async fn test_utilization_is_enriched_from_directory() {
    let upstream = MockServer::start().await;
    mount_directory(&upstream).await;
    Mock::given(method("GET"))
        .and(path("/nox/public/v1/studios/100/utilization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "startTime": "2024-03-01T06:00:00",
            "endTime": "2024-03-01T23:00:00",
            "items": [
                {"startTime": "17:00", "endTime": "18:00", "isCurrent": false, "level": "HIGH", "percentage": 70},
                {"startTime": "18:00", "endTime": "19:00", "isCurrent": true, "level": "MEDIUM", "percentage": 30}
            ]
        })))
        .expect(1)
        .mount(&upstream)
        .await;
    let h = harness(upstream).await;

    let response = h.server.get("/api/utilization/5").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["workload"], 30);
    assert_eq!(body["uuid"], "uuid-5");
    assert_eq!(body["name"], "Berlin-Mitte");
    assert_eq!(body["startTime"], "2024-03-01T06:00:00");
    assert_eq!(body["items"][1]["isCurrent"], true);

    // Served from cache, the mock expects exactly one upstream call.
    let again: Value = h.server.get("/api/utilization/5").await.json();
    assert_eq!(again, body);
}

#[tokio::test]
async fn test_upstream_failure_is_not_found() {
    let upstream = MockServer::start().await;
    mount_directory(&upstream).await;
    Mock::given(method("GET"))
        .and(path("/nox/public/v1/studios/101/utilization"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&upstream)
        .await;
    let h = harness(upstream).await;

    let response = h.server.get("/api/utilization/6").await;

    response.assert_status(StatusCode::NOT_FOUND);
    response.assert_json(&json!({"message": "could not get utilization"}));
}

#[tokio::test]
async fn test_studios_lists_directory() {
    let upstream = MockServer::start().await;
    mount_directory(&upstream).await;
    let h = harness(upstream).await;

    let response = h.server.get("/api/studios").await;

    response.assert_status_ok();
    let body: Value = response.json();
    let content = body["content"].as_array().expect("content array");
    assert_eq!(content.len(), 2);
    assert_eq!(content[0]["id"], 5);
    assert_eq!(content[0]["magiclineId"], 100);
    assert_eq!(content[0]["address"]["latitude"], 52.52);
}

#[tokio::test]
async fn test_studios_sorted_by_distance() {
    let upstream = MockServer::start().await;
    mount_directory(&upstream).await;
    let h = harness(upstream).await;

    // Near Hamburg
    let response = h
        .server
        .get("/api/studios")
        .add_query_param("latitude", 53.55)
        .add_query_param("longitude", 10.0)
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["content"][0]["id"], 6);
    assert_eq!(body["content"][1]["id"], 5);
}

#[tokio::test]
async fn test_studios_unavailable_is_not_found() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(STUDIOS_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&upstream)
        .await;
    let h = harness(upstream).await;

    let response = h.server.get("/api/studios").await;

    response.assert_status(StatusCode::NOT_FOUND);
    response.assert_json(&json!({"message": "could not get studios"}));
    let requests = h.upstream.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
}

#[tokio::test]
async fn test_static_file_is_served() {
    let upstream = MockServer::start().await;
    mount_directory(&upstream).await;
    let h = harness(upstream).await;

    let response = h.server.get("/app.js").await;

    response.assert_status_ok();
    response.assert_text("console.log('hello');");
}

#[tokio::test]
async fn test_unknown_path_falls_back_to_index() {
    let upstream = MockServer::start().await;
    mount_directory(&upstream).await;
    let h = harness(upstream).await;

    for route in ["/", "/studio/5", "/favorites/list"] {
        let response = h.server.get(route).await;
        response.assert_status_ok();
        assert!(response.text().contains("studio finder"), "route {route}");
    }
}
