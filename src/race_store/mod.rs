mod database;
mod models;
mod pipeline;
mod race_id;
mod schema;

pub use database::RaceDatabase;
pub use models::*;
pub use pipeline::{execute_ingest, load_snapshot, PipelineError};
pub use race_id::{
    compose, RaceId, RaceKey, RaceKeyError, DEFAULT_RACE_NUMBER, DEFAULT_VENUE_CODE,
};
pub use schema::RACE_VERSIONED_SCHEMAS;
