//! SQLite schema definitions for the race database.
//!
//! Array, list and object valued fields are stored as JSON in TEXT columns.
//! Timestamps are RFC 3339 UTC strings.

use crate::sqlite_column;
use crate::sqlite_persistence::{
    Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema,
};

const RACE_FK: ForeignKey = ForeignKey {
    foreign_table: "races",
    foreign_column: "race_id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const RACES_TABLE_V1: Table = Table {
    name: "races",
    columns: &[
        sqlite_column!("race_id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("race_date", &SqlType::Text, non_null = true), // YYYYMMDD
        sqlite_column!("venue_code", &SqlType::Text, non_null = true),
        sqlite_column!("race_number", &SqlType::Integer, non_null = true),
        sqlite_column!("close_at", &SqlType::Text, non_null = true),
        sqlite_column!("created_at", &SqlType::Text, non_null = true),
        sqlite_column!("updated_at", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_races_race_date", "race_date")],
};

/// One row per (race, lane).
const ENTRIES_TABLE_V1: Table = Table {
    name: "entries",
    columns: &[
        sqlite_column!(
            "race_id",
            &SqlType::Text,
            is_primary_key = true,
            non_null = true,
            foreign_key = Some(&RACE_FK)
        ),
        sqlite_column!("lane", &SqlType::Integer, is_primary_key = true, non_null = true),
        sqlite_column!("racer_id", &SqlType::Text, non_null = true),
        sqlite_column!("racer_name", &SqlType::Text, non_null = true),
        sqlite_column!("created_at", &SqlType::Text, non_null = true),
    ],
    indices: &[],
};

const PREVIEWS_TABLE_V1: Table = Table {
    name: "previews",
    columns: &[
        sqlite_column!(
            "race_id",
            &SqlType::Text,
            is_primary_key = true,
            foreign_key = Some(&RACE_FK)
        ),
        sqlite_column!("show_time", &SqlType::Text, non_null = true), // JSON [f64; 6]
        sqlite_column!("show_st", &SqlType::Text, non_null = true), // JSON [f64; 6]
        sqlite_column!("motor_score", &SqlType::Text, non_null = true), // JSON [f64; 6]
        sqlite_column!("fetched_at", &SqlType::Text, non_null = true),
    ],
    indices: &[],
};

const DECISIONS_TABLE_V1: Table = Table {
    name: "decisions",
    columns: &[
        sqlite_column!(
            "race_id",
            &SqlType::Text,
            is_primary_key = true,
            foreign_key = Some(&RACE_FK)
        ),
        sqlite_column!("status", &SqlType::Text, non_null = true),
        sqlite_column!("weak_flags", &SqlType::Text, non_null = true), // JSON array
        sqlite_column!("good_flags", &SqlType::Text, non_null = true), // JSON array
        sqlite_column!("reason_summary", &SqlType::Text, non_null = true),
        sqlite_column!("reason_details", &SqlType::Text, non_null = true), // JSON array of objects
        sqlite_column!("computed_at", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_decisions_status", "status")],
};

const PICKS_TABLE_V1: Table = Table {
    name: "picks",
    columns: &[
        sqlite_column!(
            "race_id",
            &SqlType::Text,
            is_primary_key = true,
            foreign_key = Some(&RACE_FK)
        ),
        sqlite_column!("max_points", &SqlType::Integer, non_null = true),
        sqlite_column!("tickets", &SqlType::Text, non_null = true), // JSON array of objects
        sqlite_column!("computed_at", &SqlType::Text, non_null = true),
    ],
    indices: &[],
};

/// All versioned schemas for the race database.
///
/// Version 1: races, entries, previews, decisions, picks
pub const RACE_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 1,
    tables: &[
        RACES_TABLE_V1,
        ENTRIES_TABLE_V1,
        PREVIEWS_TABLE_V1,
        DECISIONS_TABLE_V1,
        PICKS_TABLE_V1,
    ],
}];
