//! Transactional upsert of one race's worth of data.
//!
//! Statements run in a fixed order: races, entries, previews, decisions, picks.
//! Entries reference races, so the race row has to exist first. The caller owns
//! the transaction: nothing is visible until it commits, and dropping it rolls
//! every statement back.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::debug;

use super::models::*;
use super::race_id::{RaceId, RaceKey};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid payload: {0}")]
    InvalidPayload(#[from] PayloadError),

    #[error("Failed to encode {column}: {source}")]
    Encode {
        column: &'static str,
        source: serde_json::Error,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn to_json<T: Serialize + ?Sized>(column: &'static str, value: &T) -> Result<String, PipelineError> {
    serde_json::to_string(value).map_err(|source| PipelineError::Encode { column, source })
}

/// Writes the five entities of `race` inside `tx`. Does not commit.
pub fn execute_ingest(
    tx: &Transaction<'_>,
    race: &RaceKey,
    payload: &IngestPayload,
) -> Result<IngestReceipt, PipelineError> {
    payload.validate()?;

    let race_id = race.race_id();
    upsert_race(tx, &race_id, race, payload)?;
    upsert_entries(tx, &race_id, &payload.entries, &payload.ingested_at)?;
    upsert_preview(tx, &race_id, &payload.preview)?;
    upsert_decision(tx, &race_id, &payload.decision)?;
    upsert_picks(tx, &race_id, &payload.picks)?;

    debug!("Staged all entities for race {}", race_id);
    Ok(IngestReceipt {
        race_id,
        inserted: true,
    })
}

/// `created_at` is only written by the insert branch.
fn upsert_race(
    tx: &Transaction<'_>,
    race_id: &RaceId,
    race: &RaceKey,
    payload: &IngestPayload,
) -> Result<(), PipelineError> {
    tx.execute(
        "INSERT INTO races (race_id, race_date, venue_code, race_number, close_at, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
         ON CONFLICT(race_id) DO UPDATE SET
             updated_at = excluded.updated_at,
             close_at = excluded.close_at",
        params![
            race_id.as_str(),
            race.date(),
            race.venue_code(),
            race.race_number(),
            format_timestamp(&payload.close_at),
            format_timestamp(&payload.ingested_at),
        ],
    )?;
    Ok(())
}

fn upsert_entries(
    tx: &Transaction<'_>,
    race_id: &RaceId,
    entries: &[EntryRecord],
    now: &DateTime<Utc>,
) -> Result<(), PipelineError> {
    let mut stmt = tx.prepare_cached(
        "INSERT INTO entries (race_id, lane, racer_id, racer_name, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(race_id, lane) DO UPDATE SET
             racer_id = excluded.racer_id,
             racer_name = excluded.racer_name",
    )?;
    let created_at = format_timestamp(now);
    for entry in entries {
        stmt.execute(params![
            race_id.as_str(),
            entry.lane,
            entry.racer_id,
            entry.racer_name,
            created_at,
        ])?;
    }
    Ok(())
}

fn upsert_preview(
    tx: &Transaction<'_>,
    race_id: &RaceId,
    preview: &PreviewRecord,
) -> Result<(), PipelineError> {
    tx.execute(
        "INSERT INTO previews (race_id, show_time, show_st, motor_score, fetched_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(race_id) DO UPDATE SET
             show_time = excluded.show_time,
             show_st = excluded.show_st,
             motor_score = excluded.motor_score,
             fetched_at = excluded.fetched_at",
        params![
            race_id.as_str(),
            to_json("show_time", &preview.show_time)?,
            to_json("show_st", &preview.show_st)?,
            to_json("motor_score", &preview.motor_score)?,
            format_timestamp(&preview.fetched_at),
        ],
    )?;
    Ok(())
}

fn upsert_decision(
    tx: &Transaction<'_>,
    race_id: &RaceId,
    decision: &DecisionRecord,
) -> Result<(), PipelineError> {
    tx.execute(
        "INSERT INTO decisions (race_id, status, weak_flags, good_flags, reason_summary, reason_details, computed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(race_id) DO UPDATE SET
             status = excluded.status,
             weak_flags = excluded.weak_flags,
             good_flags = excluded.good_flags,
             reason_summary = excluded.reason_summary,
             reason_details = excluded.reason_details,
             computed_at = excluded.computed_at",
        params![
            race_id.as_str(),
            decision.status.as_str(),
            to_json("weak_flags", &decision.weak_flags)?,
            to_json("good_flags", &decision.good_flags)?,
            decision.reason_summary,
            to_json("reason_details", &decision.reason_details)?,
            format_timestamp(&decision.computed_at),
        ],
    )?;
    Ok(())
}

fn upsert_picks(
    tx: &Transaction<'_>,
    race_id: &RaceId,
    picks: &PicksRecord,
) -> Result<(), PipelineError> {
    tx.execute(
        "INSERT INTO picks (race_id, max_points, tickets, computed_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(race_id) DO UPDATE SET
             max_points = excluded.max_points,
             tickets = excluded.tickets,
             computed_at = excluded.computed_at",
        params![
            race_id.as_str(),
            picks.max_points,
            to_json("tickets", &picks.tickets)?,
            format_timestamp(&picks.computed_at),
        ],
    )?;
    Ok(())
}

// =============================================================================
// Read back
// =============================================================================

fn timestamp_column(row: &Row, column: &str) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(column)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn json_column<T: DeserializeOwned>(row: &Row, column: &str) -> rusqlite::Result<T> {
    let raw: String = row.get(column)?;
    serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn row_to_race(row: &Row) -> rusqlite::Result<RaceRow> {
    let race_id: String = row.get("race_id")?;
    Ok(RaceRow {
        race_id: RaceId::from_stored(race_id),
        race_date: row.get("race_date")?,
        venue_code: row.get("venue_code")?,
        race_number: row.get("race_number")?,
        close_at: timestamp_column(row, "close_at")?,
        created_at: timestamp_column(row, "created_at")?,
        updated_at: timestamp_column(row, "updated_at")?,
    })
}

fn row_to_preview(row: &Row) -> rusqlite::Result<PreviewRecord> {
    Ok(PreviewRecord {
        show_time: json_column(row, "show_time")?,
        show_st: json_column(row, "show_st")?,
        motor_score: json_column(row, "motor_score")?,
        fetched_at: timestamp_column(row, "fetched_at")?,
    })
}

fn row_to_decision(row: &Row) -> rusqlite::Result<DecisionRecord> {
    let status_str: String = row.get("status")?;
    let status = DecisionStatus::parse(&status_str).ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(0, status_str.clone(), rusqlite::types::Type::Text)
    })?;
    Ok(DecisionRecord {
        status,
        weak_flags: json_column(row, "weak_flags")?,
        good_flags: json_column(row, "good_flags")?,
        reason_summary: row.get("reason_summary")?,
        reason_details: json_column(row, "reason_details")?,
        computed_at: timestamp_column(row, "computed_at")?,
    })
}

fn row_to_picks(row: &Row) -> rusqlite::Result<PicksRecord> {
    Ok(PicksRecord {
        max_points: row.get("max_points")?,
        tickets: json_column(row, "tickets")?,
        computed_at: timestamp_column(row, "computed_at")?,
    })
}

/// Loads every stored entity of `race_id`, or `None` if the race is unknown.
pub fn load_snapshot(
    conn: &Connection,
    race_id: &RaceId,
) -> Result<Option<RaceSnapshot>, PipelineError> {
    let id = race_id.as_str();
    let Some(race) = conn
        .query_row(
            "SELECT * FROM races WHERE race_id = ?1",
            params![id],
            row_to_race,
        )
        .optional()?
    else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT lane, racer_id, racer_name FROM entries WHERE race_id = ?1 ORDER BY lane ASC",
    )?;
    let entries = stmt
        .query_map(params![id], |row| {
            Ok(EntryRecord {
                lane: row.get("lane")?,
                racer_id: row.get("racer_id")?,
                racer_name: row.get("racer_name")?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let preview = conn
        .query_row(
            "SELECT * FROM previews WHERE race_id = ?1",
            params![id],
            row_to_preview,
        )
        .optional()?;
    let decision = conn
        .query_row(
            "SELECT * FROM decisions WHERE race_id = ?1",
            params![id],
            row_to_decision,
        )
        .optional()?;
    let picks = conn
        .query_row(
            "SELECT * FROM picks WHERE race_id = ?1",
            params![id],
            row_to_picks,
        )
        .optional()?;

    Ok(Some(RaceSnapshot {
        race,
        entries,
        preview,
        decision,
        picks,
    }))
}
