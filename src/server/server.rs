use anyhow::{Context, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::{middleware, routing::get, Router};
use tracing::info;

use super::admin_auth::AdminAuthGate;
use super::health_routes::health_routes;
use super::ingest_routes::ingest_routes;
use super::metrics::metrics_handler;
use super::{log_requests, state::*, ServerConfig};
use crate::ingestion::RaceDataSource;
use crate::race_store::RaceDatabase;

impl ServerState {
    pub fn new(
        config: ServerConfig,
        auth_gate: AdminAuthGate,
        database: Option<RaceDatabase>,
        data_source: Arc<dyn RaceDataSource>,
    ) -> ServerState {
        ServerState {
            config,
            start_time: Instant::now(),
            hash: env!("GIT_HASH").to_owned(),
            auth_gate: Arc::new(auth_gate),
            database: database.map(Arc::new),
            data_source,
        }
    }
}

pub fn make_app(state: ServerState) -> Router {
    Router::new()
        .merge(health_routes())
        .nest("/admin", ingest_routes())
        .layer(middleware::from_fn_with_state(state.clone(), log_requests))
        .with_state(state)
}

pub fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

/// Serves the API and the metrics endpoint until `shutdown` resolves.
pub async fn run_server<F>(state: ServerState, metrics_port: u16, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let port = state.config.port;
    let app = make_app(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    let metrics_listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", metrics_port))
        .await
        .with_context(|| format!("Failed to bind metrics port {}", metrics_port))?;

    info!("Ready to serve at port {}!", port);
    info!("Metrics available at port {}!", metrics_port);

    let metrics_server = tokio::spawn(async move {
        axum::serve(metrics_listener, make_metrics_app()).await
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")?;

    metrics_server.abort();
    info!("Server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::DummyRaceSource;
    use crate::server::RequestsLoggingLevel;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tempfile::TempDir;
    use tower::ServiceExt; // for `oneshot`

    const SECRET: &str = "test-secret";

    fn app(secret: Option<&str>, database: Option<RaceDatabase>) -> Router {
        let config = ServerConfig {
            requests_logging_level: RequestsLoggingLevel::None,
            port: 0,
        };
        make_app(ServerState::new(
            config,
            AdminAuthGate::new(secret.map(str::to_string)),
            database,
            Arc::new(DummyRaceSource),
        ))
    }

    fn initialized_db() -> (TempDir, RaceDatabase) {
        let dir = TempDir::new().unwrap();
        let db = RaceDatabase::new(dir.path().join("races.db"));
        db.initialize().unwrap();
        (dir, db)
    }

    async fn get(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn probes_answer_without_database() {
        let app = app(None, None);

        let (status, body) = get(&app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);

        let (status, body) = get(&app, "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);

        let (status, body) = get(&app, "/health/db").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], false);
        assert_eq!(body["error"], "DATABASE_URL not set");

        let (status, body) = get(&app, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "kyotei-backend");
    }

    #[tokio::test]
    async fn ingest_is_forbidden_with_wrong_or_missing_key() {
        let (_dir, db) = initialized_db();
        let app = app(Some(SECRET), Some(db.clone()));

        for uri in [
            "/admin/ingest?date=20260201&api_key=wrong",
            "/admin/ingest?date=20260201",
        ] {
            let (status, body) = get(&app, uri).await;
            assert_eq!(status, StatusCode::FORBIDDEN, "{}", uri);
            assert_eq!(body["ok"], false);
        }

        let conn = db.connect().unwrap();
        let races: i64 = conn
            .query_row("SELECT COUNT(*) FROM races", [], |r| r.get(0))
            .unwrap();
        assert_eq!(races, 0);
    }

    #[tokio::test]
    async fn ingest_without_secret_is_a_configuration_error() {
        let (_dir, db) = initialized_db();
        let app = app(None, Some(db));

        let (status, body) = get(&app, "/admin/ingest?date=20260201&api_key=anything").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "ADMIN_API_KEY is not set");
    }

    #[tokio::test]
    async fn auth_runs_before_request_validation() {
        let app = app(Some(SECRET), None);

        let (status, _) = get(&app, "/admin/ingest?date=garbage&api_key=wrong").await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = get(&app, &format!("/admin/ingest?date=garbage&api_key={}", SECRET)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) =
            get(&app, &format!("/admin/ingest?date=20260201&api_key={}", SECRET)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "DATABASE_URL not set");
    }

    #[tokio::test]
    async fn repeated_query_keys_are_gated_then_rejected_as_json() {
        let (_dir, db) = initialized_db();
        let app = app(Some(SECRET), Some(db.clone()));

        let (status, body) = get(&app, "/admin/ingest?date=20260201&date=20260202").await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["ok"], false);

        let (status, body) = get(
            &app,
            &format!("/admin/ingest?date=20260201&date=20260202&api_key={}", SECRET),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);
        assert_eq!(body["error"], "Repeated query parameter 'date'");

        let (status, body) = get(
            &app,
            &format!("/admin/races/20260201-11-01?api_key={}&api_key={}", SECRET, SECRET),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["ok"], false);

        let conn = db.connect().unwrap();
        let races: i64 = conn
            .query_row("SELECT COUNT(*) FROM races", [], |r| r.get(0))
            .unwrap();
        assert_eq!(races, 0);
    }

    #[tokio::test]
    async fn ingest_then_read_back() {
        let (_dir, db) = initialized_db();
        let app = app(Some(SECRET), Some(db));

        let (status, body) =
            get(&app, &format!("/admin/ingest?date=20260201&api_key={}", SECRET)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["raceId"], "20260201-11-01");
        assert_eq!(body["inserted"], true);

        let (status, body) = get(
            &app,
            &format!("/admin/races/20260201-11-01?api_key={}", SECRET),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["race"]["raceId"], "20260201-11-01");
        assert_eq!(body["entries"].as_array().unwrap().len(), 6);
        assert_eq!(body["picks"]["maxPoints"], 7);

        let (status, _) = get(
            &app,
            &format!("/admin/races/20260201-11-02?api_key={}", SECRET),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
