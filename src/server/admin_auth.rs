//! Shared-secret gate in front of the admin routes.

use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("ADMIN_API_KEY is not set")]
    Unconfigured,

    #[error("Forbidden")]
    Forbidden,
}

/// Holds the admin secret loaded at startup.
///
/// A gate without a secret rejects every call as [`AuthError::Unconfigured`],
/// whatever key the caller sends.
pub struct AdminAuthGate {
    secret: Option<String>,
}

impl AdminAuthGate {
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    pub fn authorize(&self, provided: Option<&str>) -> Result<(), AuthError> {
        let Some(secret) = &self.secret else {
            error!("Admin call rejected: no admin secret configured");
            return Err(AuthError::Unconfigured);
        };
        match provided {
            Some(key) if constant_time_eq(key.as_bytes(), secret.as_bytes()) => Ok(()),
            Some(_) => {
                warn!("Admin call rejected: wrong api key");
                Err(AuthError::Forbidden)
            }
            None => {
                warn!("Admin call rejected: missing api key");
                Err(AuthError::Forbidden)
            }
        }
    }
}

/// Compares without short-circuiting on the first differing byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
