//! Kyotei prediction backend library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod config;
pub mod ingestion;
pub mod race_store;
pub mod server;
pub mod sqlite_persistence;

// Re-export commonly used types for convenience
pub use ingestion::{DummyRaceSource, RaceDataSource};
pub use race_store::{RaceDatabase, RaceId, RaceKey};
pub use server::{run_server, RequestsLoggingLevel};
