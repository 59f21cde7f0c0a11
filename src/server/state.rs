use axum::extract::FromRef;

use crate::ingestion::RaceDataSource;
use crate::race_store::RaceDatabase;
use std::sync::Arc;
use std::time::Instant;

use super::admin_auth::AdminAuthGate;
use super::ServerConfig;

pub type GuardedAuthGate = Arc<AdminAuthGate>;
pub type OptionalRaceDatabase = Option<Arc<RaceDatabase>>;
pub type GuardedDataSource = Arc<dyn RaceDataSource>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub hash: String,
    pub auth_gate: GuardedAuthGate,
    pub database: OptionalRaceDatabase,
    pub data_source: GuardedDataSource,
}

impl FromRef<ServerState> for OptionalRaceDatabase {
    fn from_ref(input: &ServerState) -> Self {
        input.database.clone()
    }
}
