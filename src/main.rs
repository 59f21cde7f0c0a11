use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use kyotei_backend::config::{AppConfig, CliConfig, FileConfig};
use kyotei_backend::ingestion::DummyRaceSource;
use kyotei_backend::server::{self, AdminAuthGate, ServerConfig, ServerState};
use kyotei_backend::RequestsLoggingLevel;

#[derive(Parser, Debug)]
struct CliArgs {
    /// SQLite database location: a file path, `sqlite://<path>` or `sqlite:<path>`.
    #[clap(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Shared secret required by the admin routes.
    #[clap(long, env = "ADMIN_API_KEY", hide_env_values = true)]
    pub admin_api_key: Option<String>,

    /// The port to listen on.
    #[clap(short, long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Optional TOML config file. Its values override the command line.
    #[clap(long)]
    pub config: Option<PathBuf>,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            database_url: self.database_url.clone(),
            admin_api_key: self.admin_api_key.clone(),
            port: self.port,
            metrics_port: self.metrics_port,
            logging_level: self.logging_level.clone(),
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl-C, shutting down...");
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config file {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let app_config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    match &app_config.database {
        Some(database) => {
            let database = database.clone();
            tokio::task::spawn_blocking(move || database.initialize())
                .await
                .context("Database initialization task failed")??;
        }
        None => warn!("DATABASE_URL is not set, database routes will report an error"),
    }
    let auth_gate = AdminAuthGate::new(app_config.admin_api_key.clone());
    if !auth_gate.is_configured() {
        warn!("ADMIN_API_KEY is not set, admin routes will answer 500");
    }

    info!("Initializing metrics...");
    server::metrics::init_metrics();

    let state = ServerState::new(
        ServerConfig {
            requests_logging_level: app_config.logging_level.clone(),
            port: app_config.port,
        },
        auth_gate,
        app_config.database.clone(),
        Arc::new(DummyRaceSource),
    );

    server::run_server(state, app_config.metrics_port, shutdown_signal()).await
}
