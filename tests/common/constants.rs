//! Shared constants for end-to-end tests
//!
//! When test data changes (secrets, dates, expected ids), update only this file.

#![allow(dead_code)]

// ============================================================================
// Credentials
// ============================================================================

/// Admin secret configured on the default test server
pub const ADMIN_API_KEY: &str = "test-admin-key";

// ============================================================================
// Race data
// ============================================================================

/// Date used by most ingest tests
pub const RACE_DATE: &str = "20260201";

/// Race id composed from RACE_DATE with the default venue and race number
pub const RACE_ID: &str = "20260201-11-01";

/// Number of lanes (and entries) in every race
pub const LANE_COUNT: usize = 6;

/// Number of tickets produced by the dummy data source
pub const DUMMY_TICKET_COUNT: usize = 7;

// ============================================================================
// Timeouts
// ============================================================================

/// How long to wait for a spawned server to answer
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Per-request timeout of the test client
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Delay between readiness polls
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;
