//! End-to-end tests for the liveness and connectivity probes

mod common;

use common::{TestClient, TestServer, TestServerOptions};
use reqwest::StatusCode;
use serde_json::{json, Value};

async fn body(response: reqwest::Response) -> Value {
    response.json().await.expect("Response is not JSON")
}

async fn spawn_without_database() -> TestServer {
    TestServer::spawn_with(TestServerOptions {
        with_database: false,
        ..Default::default()
    })
    .await
}

#[tokio::test]
async fn test_health_is_ok() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.health().await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body(response).await, json!({ "ok": true }));

    let response = client.api_health().await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body(response).await, json!({ "ok": true }));
}

#[tokio::test]
async fn test_home_reports_service() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.home().await;
    assert_eq!(response.status(), StatusCode::OK);
    let stats = body(response).await;
    assert_eq!(stats["ok"], true);
    assert_eq!(stats["service"], "kyotei-backend");
    assert!(stats["version"].is_string());
    assert!(stats["uptime"].as_str().unwrap().starts_with("0d"));
}

#[tokio::test]
async fn test_health_db_connected() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.health_db().await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body(response).await, json!({ "ok": true, "db": "connected" }));
}

#[tokio::test]
async fn test_health_db_without_database_url() {
    let server = spawn_without_database().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.health_db().await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body(response).await,
        json!({ "ok": false, "error": "DATABASE_URL not set" })
    );
}

#[tokio::test]
async fn test_dbtest_selects_one() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.dbtest().await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body(response).await, json!({ "ok": true, "select1": 1 }));
}

#[tokio::test]
async fn test_dbtest_without_database_url_fails() {
    let server = spawn_without_database().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.dbtest().await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body(response).await["ok"], false);
}
