//! HTTP client for end-to-end tests
//!
//! Wraps reqwest and provides one method per backend endpoint.
//! When API routes or query formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

#[allow(dead_code)]
impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Response {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .query(query)
            .send()
            .await
            .expect("Request failed")
    }

    // ========================================================================
    // Probes
    // ========================================================================

    pub async fn home(&self) -> Response {
        self.get("/", &[]).await
    }

    pub async fn health(&self) -> Response {
        self.get("/health", &[]).await
    }

    pub async fn api_health(&self) -> Response {
        self.get("/api/health", &[]).await
    }

    pub async fn health_db(&self) -> Response {
        self.get("/health/db", &[]).await
    }

    pub async fn dbtest(&self) -> Response {
        self.get("/dbtest", &[]).await
    }

    // ========================================================================
    // Admin
    // ========================================================================

    /// GET /admin/ingest for the default venue and race number
    pub async fn ingest(&self, date: &str, api_key: Option<&str>) -> Response {
        let mut query = vec![("date", date)];
        if let Some(key) = api_key {
            query.push(("api_key", key));
        }
        self.get("/admin/ingest", &query).await
    }

    /// GET /admin/ingest with an explicit venue and race number
    pub async fn ingest_race(
        &self,
        date: &str,
        venue: &str,
        race_number: &str,
        api_key: &str,
    ) -> Response {
        self.get(
            "/admin/ingest",
            &[
                ("date", date),
                ("venue", venue),
                ("race_number", race_number),
                ("api_key", api_key),
            ],
        )
        .await
    }

    pub async fn get_race(&self, race_id: &str, api_key: &str) -> Response {
        self.get(&format!("/admin/races/{}", race_id), &[("api_key", api_key)])
            .await
    }
}
