//! Admin ingestion HTTP routes.
//!
//! Provides endpoints for:
//! - Ingesting one race through the configured data source
//! - Reading back everything stored for a race

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

use super::error::ApiError;
use super::metrics::{record_db_transaction, record_ingest};
use super::state::ServerState;
use crate::race_store::{
    execute_ingest, load_snapshot, IngestPayload, IngestReceipt, PipelineError, RaceDatabase,
    RaceId, RaceKey, RaceSnapshot, DEFAULT_RACE_NUMBER, DEFAULT_VENUE_CODE,
};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Query string of the admin routes.
///
/// Built from raw pairs instead of a `Query<T>` struct so that a repeated key
/// cannot reject the request before the auth gate runs.
#[derive(Debug, Default)]
pub struct AdminQuery {
    pub date: Option<String>,
    pub api_key: Option<String>,
    pub venue: Option<String>,
    pub race_number: Option<String>,
    repeated: Vec<String>,
}

impl AdminQuery {
    /// Unknown keys are ignored.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut query = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "date" => &mut query.date,
                "api_key" => &mut query.api_key,
                "venue" => &mut query.venue,
                "race_number" => &mut query.race_number,
                _ => continue,
            };
            if slot.replace(value).is_some() && !query.repeated.contains(&key) {
                query.repeated.push(key);
            }
        }
        query
    }

    /// A repeated key is ambiguous and counts as no key at all.
    fn credential(&self) -> Option<&str> {
        if self.repeated.iter().any(|key| key == "api_key") {
            return None;
        }
        self.api_key.as_deref()
    }

    fn race_key(&self) -> Result<RaceKey, ApiError> {
        if let Some(key) = self.repeated.first() {
            return Err(ApiError::InvalidRequest(format!(
                "Repeated query parameter '{}'",
                key
            )));
        }
        let date = self
            .date
            .as_deref()
            .ok_or_else(|| ApiError::InvalidRequest("Missing query parameter 'date'".to_string()))?;
        let venue = self.venue.as_deref().unwrap_or(DEFAULT_VENUE_CODE);
        let race_number = match self.race_number.as_deref() {
            None => DEFAULT_RACE_NUMBER,
            Some(raw) => raw.parse::<u32>().map_err(|_| {
                ApiError::InvalidRequest(format!("Invalid race_number '{}'", raw))
            })?,
        };
        Ok(RaceKey::new(date, venue, race_number)?)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    pub ok: bool,
    pub race_id: RaceId,
    pub inserted: bool,
}

#[derive(Debug, Serialize)]
pub struct SnapshotResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub snapshot: RaceSnapshot,
}

// =============================================================================
// Blocking database work
// =============================================================================

fn require_database(state: &ServerState) -> Result<Arc<RaceDatabase>, ApiError> {
    state.database.clone().ok_or_else(ApiError::database_unset)
}

/// Runs `work` on the blocking pool.
async fn run_blocking<T, F>(work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::Persistence(format!("Database task failed: {}", e)))?
}

fn connect(database: &RaceDatabase) -> Result<Connection, ApiError> {
    database
        .connect()
        .map_err(|e| ApiError::Persistence(format!("{:#}", e)))
}

/// Dropping the transaction on an error path rolls back whatever was already written.
fn commit_ingest(
    conn: &mut Connection,
    race: &RaceKey,
    payload: &IngestPayload,
) -> Result<IngestReceipt, PipelineError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let receipt = execute_ingest(&tx, race, payload)?;
    tx.commit()?;
    Ok(receipt)
}

fn ingest_in_transaction(
    database: &RaceDatabase,
    race: &RaceKey,
    payload: &IngestPayload,
) -> Result<IngestReceipt, ApiError> {
    let mut conn = connect(database)?;
    let start = Instant::now();
    let result = commit_ingest(&mut conn, race, payload);
    record_db_transaction(start.elapsed());
    Ok(result?)
}

// =============================================================================
// Handlers
// =============================================================================

async fn run_ingest(state: &ServerState, query: AdminQuery) -> Result<IngestReceipt, ApiError> {
    state.auth_gate.authorize(query.credential())?;
    let race = query.race_key()?;
    let database = require_database(state)?;

    let source = state.data_source.clone();
    let payload = source
        .fetch(&race, Utc::now())
        .map_err(|e| ApiError::DataSource(format!("{}: {:#}", source.name(), e)))?;
    debug!("Fetched race {} from source {}", race.race_id(), source.name());

    run_blocking(move || ingest_in_transaction(&database, &race, &payload)).await
}

/// GET /admin/ingest?date=YYYYMMDD&api_key=...
async fn ingest(
    State(state): State<ServerState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<IngestResponse>, ApiError> {
    match run_ingest(&state, AdminQuery::from_pairs(pairs)).await {
        Ok(receipt) => {
            record_ingest("success");
            info!("Ingested race {}", receipt.race_id);
            Ok(Json(IngestResponse {
                ok: true,
                race_id: receipt.race_id,
                inserted: receipt.inserted,
            }))
        }
        Err(err) => {
            record_ingest(err.outcome());
            if err.status().is_server_error() {
                error!("Ingest failed: {}", err);
            } else {
                debug!("Ingest rejected: {}", err);
            }
            Err(err)
        }
    }
}

/// GET /admin/races/{race_id}?api_key=...
async fn get_race(
    State(state): State<ServerState>,
    Path(race_id): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<SnapshotResponse>, ApiError> {
    let query = AdminQuery::from_pairs(pairs);
    state.auth_gate.authorize(query.credential())?;
    let race_id = race_id.parse::<RaceKey>()?.race_id();
    let database = require_database(&state)?;

    let lookup_id = race_id.clone();
    let snapshot = run_blocking(move || {
        let conn = connect(&database)?;
        Ok(load_snapshot(&conn, &lookup_id)?)
    })
    .await?;

    match snapshot {
        Some(snapshot) => Ok(Json(SnapshotResponse { ok: true, snapshot })),
        None => Err(ApiError::NotFound(format!("Race {} not found", race_id))),
    }
}

pub fn ingest_routes() -> Router<ServerState> {
    Router::new()
        .route("/ingest", get(ingest))
        .route("/races/{race_id}", get(get_race))
}
