use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use super::race_id::RaceId;

/// Number of boats (and lanes) in a race.
pub const LANE_COUNT: usize = 6;

/// One value per lane, index 0 being lane 1.
pub type LaneValues = [f64; LANE_COUNT];

#[derive(Debug, Error, PartialEq)]
pub enum PayloadError {
    #[error("Expected {expected} entries, got {actual}")]
    EntryCount { expected: usize, actual: usize },

    #[error("Entry at position {position} has lane {lane}, expected {expected}")]
    EntryLane {
        position: usize,
        lane: u8,
        expected: u8,
    },

    #[error("Entry for lane {0} has an empty racer id")]
    EmptyRacerId(u8),

    #[error("Preview {field} holds a non-finite value for lane {lane}")]
    NonFiniteLaneValue { field: &'static str, lane: usize },

    #[error("Invalid ticket '{0}': expected three distinct lanes between 1 and 6 as a-b-c")]
    InvalidTicket(String),

    #[error("Picks declare max_points {max_points} but hold {tickets} tickets")]
    TicketCount { max_points: u32, tickets: usize },

    #[error("Ticket at position {position} has rank {rank}, expected {expected}")]
    TicketRank {
        position: usize,
        rank: u32,
        expected: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionStatus {
    Go,
    Skip,
}

impl DecisionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionStatus::Go => "GO",
            DecisionStatus::Skip => "SKIP",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "GO" => Some(DecisionStatus::Go),
            "SKIP" => Some(DecisionStatus::Skip),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketTag {
    Recommended,
    Hedge,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryRecord {
    pub lane: u8,
    pub racer_id: String,
    pub racer_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRecord {
    pub show_time: LaneValues,
    pub show_st: LaneValues,
    pub motor_score: LaneValues,
    pub fetched_at: DateTime<Utc>,
}

/// One line of the human-readable reasoning behind a decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionDetail {
    pub key: String,
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRecord {
    pub status: DecisionStatus,
    pub weak_flags: BTreeSet<String>,
    pub good_flags: BTreeSet<String>,
    pub reason_summary: String,
    pub reason_details: Vec<DecisionDetail>,
    pub computed_at: DateTime<Utc>,
}

/// A trifecta combination, e.g. `1-2-6`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub ticket: String,
    pub rank: u32,
    pub tag: TicketTag,
}

impl Ticket {
    /// Lanes of the combination in finishing order.
    pub fn lanes(&self) -> Result<[u8; 3], PayloadError> {
        let invalid = || PayloadError::InvalidTicket(self.ticket.clone());
        let mut lanes = [0u8; 3];
        let mut parts = self.ticket.split('-');
        for slot in lanes.iter_mut() {
            let lane = parts
                .next()
                .filter(|p| p.len() == 1)
                .and_then(|p| p.parse::<u8>().ok())
                .filter(|lane| (1..=LANE_COUNT as u8).contains(lane))
                .ok_or_else(invalid)?;
            *slot = lane;
        }
        if parts.next().is_some() || lanes[0] == lanes[1] || lanes[0] == lanes[2] || lanes[1] == lanes[2] {
            return Err(invalid());
        }
        Ok(lanes)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PicksRecord {
    pub max_points: u32,
    pub tickets: Vec<Ticket>,
    pub computed_at: DateTime<Utc>,
}

/// Everything written for one race by a single ingest call.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestPayload {
    /// Time of the ingest, stored as the race's `updated_at` (and `created_at` on first insert).
    pub ingested_at: DateTime<Utc>,
    pub close_at: DateTime<Utc>,
    pub entries: Vec<EntryRecord>,
    pub preview: PreviewRecord,
    pub decision: DecisionRecord,
    pub picks: PicksRecord,
}

impl IngestPayload {
    /// Checks the shape invariants that the tables cannot express.
    pub fn validate(&self) -> Result<(), PayloadError> {
        if self.entries.len() != LANE_COUNT {
            return Err(PayloadError::EntryCount {
                expected: LANE_COUNT,
                actual: self.entries.len(),
            });
        }
        for (position, entry) in self.entries.iter().enumerate() {
            let expected = position as u8 + 1;
            if entry.lane != expected {
                return Err(PayloadError::EntryLane {
                    position,
                    lane: entry.lane,
                    expected,
                });
            }
            if entry.racer_id.trim().is_empty() {
                return Err(PayloadError::EmptyRacerId(entry.lane));
            }
        }

        for (field, values) in [
            ("show_time", &self.preview.show_time),
            ("show_st", &self.preview.show_st),
            ("motor_score", &self.preview.motor_score),
        ] {
            if let Some(index) = values.iter().position(|v| !v.is_finite()) {
                return Err(PayloadError::NonFiniteLaneValue {
                    field,
                    lane: index + 1,
                });
            }
        }

        let picks = &self.picks;
        if picks.tickets.len() != picks.max_points as usize {
            return Err(PayloadError::TicketCount {
                max_points: picks.max_points,
                tickets: picks.tickets.len(),
            });
        }
        for (position, ticket) in picks.tickets.iter().enumerate() {
            ticket.lanes()?;
            let expected = position as u32 + 1;
            if ticket.rank != expected {
                return Err(PayloadError::TicketRank {
                    position,
                    rank: ticket.rank,
                    expected,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceRow {
    pub race_id: RaceId,
    pub race_date: String,
    pub venue_code: String,
    pub race_number: u32,
    pub close_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// All stored entities of one race.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceSnapshot {
    pub race: RaceRow,
    pub entries: Vec<EntryRecord>,
    pub preview: Option<PreviewRecord>,
    pub decision: Option<DecisionRecord>,
    pub picks: Option<PicksRecord>,
}

/// Result of a committed ingest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReceipt {
    pub race_id: RaceId,
    pub inserted: bool,
}
