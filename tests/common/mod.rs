//! Common test infrastructure
//!
//! This module provides all the infrastructure needed for end-to-end tests.
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{TestServer, TestClient, ADMIN_API_KEY, RACE_DATE};
//! use reqwest::StatusCode;
//!
//! #[tokio::test]
//! async fn test_ingest() {
//!     let server = TestServer::spawn().await;
//!     let client = TestClient::new(server.base_url.clone());
//!
//!     let response = client.ingest(RACE_DATE, Some(ADMIN_API_KEY)).await;
//!     assert_eq!(response.status(), StatusCode::OK);
//! }
//! ```

mod client;
mod constants;
mod server;

// Public API - this is what tests import
pub use client::TestClient;
pub use constants::*;
pub use server::{TestServer, TestServerOptions};
