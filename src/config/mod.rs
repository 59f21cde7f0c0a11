mod file_config;

pub use file_config::FileConfig;

use crate::race_store::RaceDatabase;
use crate::server::RequestsLoggingLevel;
use anyhow::{Context, Result};
use clap::ValueEnum;
use std::fmt;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub database_url: Option<String>,
    pub admin_api_key: Option<String>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
}

#[derive(Clone)]
pub struct AppConfig {
    /// `None` when no database URL was configured.
    pub database: Option<RaceDatabase>,
    /// `None` when no admin secret was configured.
    pub admin_api_key: Option<String>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("database", &self.database)
            .field(
                "admin_api_key",
                &self.admin_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("port", &self.port)
            .field("metrics_port", &self.metrics_port)
            .field("logging_level", &self.logging_level)
            .finish()
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present. Empty strings count as unset.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let database_url = non_empty(file.database_url).or_else(|| non_empty(cli.database_url.clone()));
        let database = database_url
            .as_deref()
            .map(RaceDatabase::from_url)
            .transpose()
            .context("Invalid database URL")?;

        let admin_api_key =
            non_empty(file.admin_api_key).or_else(|| non_empty(cli.admin_api_key.clone()));

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        Ok(Self {
            database,
            admin_api_key,
            port,
            metrics_port,
            logging_level,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
