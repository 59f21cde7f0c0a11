use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

use super::RaceDataSource;
use crate::race_store::{
    DecisionDetail, DecisionRecord, DecisionStatus, EntryRecord, IngestPayload, LaneValues,
    PicksRecord, PreviewRecord, RaceKey, Ticket, TicketTag, LANE_COUNT,
};

const SHOW_TIME: LaneValues = [6.72, 6.75, 6.78, 6.80, 6.77, 6.74];
const SHOW_ST: LaneValues = [0.12, 0.14, 0.16, 0.13, 0.15, 0.11];
const MOTOR_SCORE: LaneValues = [38.1, 42.3, 27.5, 31.0, 33.2, 29.9];

const GOOD_FLAGS: &[&str] = &["TIME_TOP3", "ST_TOP3"];
const REASON_SUMMARY: &str = "条件が揃っているため、今回はGOです。";
const REASON_DETAILS: &[(&str, &str, &str)] = &[
    ("showTimeRank", "展示タイム", "2位"),
    ("showStRank", "展示ST", "3位"),
];

const TICKETS: &[&str] = &["1-2-6", "1-6-2", "1-2-3", "1-3-2", "1-2-4", "1-4-2", "1-2-5"];

/// Fixed placeholder data. Every race gets the same line-up and the same picks.
#[derive(Debug, Clone, Copy, Default)]
pub struct DummyRaceSource;

impl RaceDataSource for DummyRaceSource {
    fn name(&self) -> &'static str {
        "dummy"
    }

    fn fetch(&self, _race: &RaceKey, now: DateTime<Utc>) -> Result<IngestPayload> {
        let entries = (1..=LANE_COUNT as u8)
            .map(|lane| EntryRecord {
                lane,
                racer_id: format!("R{:02}", lane),
                racer_name: format!("ダミー選手{}", lane),
            })
            .collect();

        let decision = DecisionRecord {
            status: DecisionStatus::Go,
            weak_flags: BTreeSet::new(),
            good_flags: GOOD_FLAGS.iter().map(|f| f.to_string()).collect(),
            reason_summary: REASON_SUMMARY.to_string(),
            reason_details: REASON_DETAILS
                .iter()
                .map(|(key, label, value)| DecisionDetail {
                    key: key.to_string(),
                    label: label.to_string(),
                    value: value.to_string(),
                })
                .collect(),
            computed_at: now,
        };

        let tickets: Vec<Ticket> = TICKETS
            .iter()
            .zip(1..)
            .map(|(ticket, rank)| Ticket {
                ticket: ticket.to_string(),
                rank,
                tag: TicketTag::Recommended,
            })
            .collect();

        Ok(IngestPayload {
            ingested_at: now,
            close_at: now,
            entries,
            preview: PreviewRecord {
                show_time: SHOW_TIME,
                show_st: SHOW_ST,
                motor_score: MOTOR_SCORE,
                fetched_at: now,
            },
            decision,
            picks: PicksRecord {
                max_points: tickets.len() as u32,
                tickets,
                computed_at: now,
            },
        })
    }
}
