use anyhow::{bail, Context, Result};
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use super::schema::RACE_VERSIONED_SCHEMAS;
use crate::sqlite_persistence::VersionedSchema;

/// How long a connection waits on a locked database file before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Location of the race database.
///
/// Connections are not kept around: each unit of work opens its own
/// connection with [`RaceDatabase::connect`] and drops it when done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaceDatabase {
    path: PathBuf,
}

impl RaceDatabase {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Accepts `sqlite:///abs/path`, `sqlite://rel/path`, `sqlite:path` or a plain path.
    pub fn from_url(url: &str) -> Result<Self> {
        let url = url.trim();
        let path = if let Some(rest) = url.strip_prefix("sqlite://") {
            rest
        } else if let Some(rest) = url.strip_prefix("sqlite:") {
            rest
        } else if let Some((scheme, _)) = url.split_once("://") {
            bail!("Unsupported database URL scheme '{}', expected sqlite", scheme);
        } else {
            url
        };

        if path.is_empty() {
            bail!("Database URL '{}' does not name a file", url);
        }
        if path == ":memory:" {
            bail!("In-memory databases cannot be shared across requests");
        }
        Ok(Self::new(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the schema on a fresh database file, validates it otherwise.
    pub fn initialize(&self) -> Result<()> {
        let is_new_db = !self.path.exists();
        let conn = Connection::open(&self.path)
            .with_context(|| format!("Failed to open race database at {:?}", self.path))?;
        let latest = RACE_VERSIONED_SCHEMAS
            .last()
            .context("No race schema declared")?;

        if is_new_db {
            info!("Creating new race database at {:?}", self.path);
            latest.create(&conn)?;
            return Ok(());
        }

        let db_version = VersionedSchema::read_version(&conn)?;
        let schema = RACE_VERSIONED_SCHEMAS
            .iter()
            .find(|s| s.version as i64 == db_version)
            .with_context(|| format!("Unknown race database version {}", db_version))?;
        schema.validate(&conn).with_context(|| {
            format!(
                "Race database schema validation failed for version {}",
                db_version
            )
        })?;
        if schema.version != latest.version {
            bail!(
                "Race database is at version {} but version {} is required",
                schema.version,
                latest.version
            );
        }
        info!("Opened race database at {:?} (version {})", self.path, db_version);
        Ok(())
    }

    /// Opens a connection for one unit of work. Never creates the file.
    pub fn connect(&self) -> Result<Connection> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open race database at {:?}", self.path))?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute("PRAGMA foreign_keys = ON;", [])?;
        Ok(conn)
    }

    /// Trivial round trip used by the connectivity probes.
    pub fn select_one(&self) -> Result<i64> {
        let conn = self.connect()?;
        Ok(conn.query_row("SELECT 1", [], |row| row.get(0))?)
    }
}
