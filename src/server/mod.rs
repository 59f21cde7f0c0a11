pub mod admin_auth;
pub mod config;
pub mod error;
mod health_routes;
mod http_layers;
mod ingest_routes;
pub mod metrics;
pub mod server;
pub mod state;

pub use admin_auth::{AdminAuthGate, AuthError};
pub use config::ServerConfig;
pub use error::ApiError;
pub use health_routes::SERVICE_NAME;
pub use http_layers::*;
pub use server::{make_app, run_server};
pub use state::ServerState;
