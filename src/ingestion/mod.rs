//! Acquisition of race data.
//!
//! Sources produce a complete [`IngestPayload`] for one race; persisting it is
//! the race store's job.

mod dummy_source;

pub use dummy_source::DummyRaceSource;

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::race_store::{IngestPayload, RaceKey};

/// Produces the data to ingest for a race.
pub trait RaceDataSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn fetch(&self, race: &RaceKey, now: DateTime<Utc>) -> Result<IngestPayload>;
}
