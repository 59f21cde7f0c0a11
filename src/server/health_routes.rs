//! Liveness and connectivity probes.

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use tracing::warn;

use super::error::ApiError;
use super::state::{OptionalRaceDatabase, ServerState};

pub const SERVICE_NAME: &str = "kyotei-backend";

#[derive(Serialize)]
struct ServerStats {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
    pub hash: String,
    pub uptime: String,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    Json(ServerStats {
        ok: true,
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        hash: state.hash.clone(),
        uptime: format_uptime(state.start_time.elapsed()),
    })
}

async fn health() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

/// Runs `SELECT 1` on a fresh connection off the async runtime.
async fn probe(database: OptionalRaceDatabase) -> Result<i64, ApiError> {
    let database = database.ok_or_else(ApiError::database_unset)?;
    tokio::task::spawn_blocking(move || database.select_one())
        .await
        .map_err(|e| ApiError::Persistence(e.to_string()))?
        .map_err(|e| ApiError::Persistence(format!("{:#}", e)))
}

/// Always answers 200; failures are reported in the body.
async fn health_db(State(database): State<OptionalRaceDatabase>) -> impl IntoResponse {
    match probe(database).await {
        Ok(_) => Json(json!({ "ok": true, "db": "connected" })),
        Err(err) => {
            warn!("Database probe failed: {}", err);
            Json(json!({ "ok": false, "error": err.to_string() }))
        }
    }
}

async fn dbtest(State(database): State<OptionalRaceDatabase>) -> Result<impl IntoResponse, ApiError> {
    let value = probe(database).await?;
    Ok(Json(json!({ "ok": true, "select1": value })))
}

pub fn health_routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/api/health", get(health))
        .route("/health/db", get(health_db))
        .route("/dbtest", get(dbtest))
}
