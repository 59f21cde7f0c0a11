//! Test server lifecycle management
//!
//! This module manages spawning and shutting down test HTTP servers.
//! Each test gets an isolated server with its own database file.

use super::constants::*;
use kyotei_backend::ingestion::DummyRaceSource;
use kyotei_backend::race_store::RaceDatabase;
use kyotei_backend::server::{make_app, AdminAuthGate, ServerConfig, ServerState};
use kyotei_backend::RequestsLoggingLevel;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// What the spawned server is configured with
pub struct TestServerOptions {
    pub admin_api_key: Option<String>,
    pub with_database: bool,
}

impl Default for TestServerOptions {
    fn default() -> Self {
        Self {
            admin_api_key: Some(ADMIN_API_KEY.to_string()),
            with_database: true,
        }
    }
}

/// Test server instance with an isolated database
///
/// When dropped, the server gracefully shuts down and the database file is removed.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    #[allow(dead_code)]
    pub port: u16,

    /// Database for direct inspection in tests, if one was configured
    pub database: Option<RaceDatabase>,

    // Private fields - keep resources alive until drop
    _temp_db_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a server with an admin secret and an initialized database
    pub async fn spawn() -> Self {
        Self::spawn_with(TestServerOptions::default()).await
    }

    /// Spawns a new test server on a random port
    ///
    /// # Panics
    ///
    /// Panics if the database cannot be created, the port cannot be bound or
    /// the server doesn't become ready within the timeout.
    pub async fn spawn_with(options: TestServerOptions) -> Self {
        let temp_db_dir = TempDir::new().expect("Failed to create temp dir");
        let database = if options.with_database {
            let db = RaceDatabase::new(temp_db_dir.path().join("races.db"));
            db.initialize().expect("Failed to initialize race database");
            Some(db)
        } else {
            None
        };

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");

        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let base_url = format!("http://127.0.0.1:{}", port);

        // Create shutdown channel
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let config = ServerConfig {
            port,
            requests_logging_level: RequestsLoggingLevel::None,
        };
        let state = ServerState::new(
            config,
            AdminAuthGate::new(options.admin_api_key),
            database.clone(),
            Arc::new(DummyRaceSource),
        );
        let app = make_app(state);

        // Spawn server in background task with graceful shutdown
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            database,
            _temp_db_dir: temp_db_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Counts the rows of `table` in the server's database.
    ///
    /// # Panics
    ///
    /// Panics if the server was spawned without a database.
    #[allow(dead_code)]
    pub fn count_rows(&self, table: &str) -> i64 {
        let conn = self
            .database
            .as_ref()
            .expect("Server has no database")
            .connect()
            .expect("Failed to connect to test database");
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
            row.get(0)
        })
        .expect("Failed to count rows")
    }

    /// Waits for the server to become ready by polling the /health endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/health", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
        // TempDir will be cleaned up automatically
    }
}
