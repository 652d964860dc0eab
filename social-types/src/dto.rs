//! Data Transfer Objects (DTOs) for requests and responses.

use serde::{Deserialize, Serialize};

use crate::domain::User;
use crate::error::DomainError;

// ─────────────────────────────────────────────────────────────────────────────
// Authentication DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to register a new (pending) user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterUserRequest {
    /// Checks the plaintext password before it is hashed.
    pub fn validate(&self) -> Result<(), DomainError> {
        let len = self.password.chars().count();
        if !(3..=72).contains(&len) {
            return Err(DomainError::ValidationError(
                "password must be between 3 and 72 characters".into(),
            ));
        }
        Ok(())
    }
}

/// Registered user plus the raw invitation token.
#[derive(Debug, Clone, Serialize)]
pub struct UserWithToken {
    #[serde(flatten)]
    pub user: User,
    pub token: String,
}

/// Request to exchange credentials for a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTokenRequest {
    pub email: String,
    pub password: String,
}

/// Signed bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Operational DTOs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub env: String,
    pub version: String,
}

/// Connection pool gauges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Open connections, idle or in use.
    pub size: u32,
    pub idle: usize,
}

/// Snapshot served on the basic-auth protected debug route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugStats {
    pub version: String,
    pub database: Option<PoolStats>,
    pub rate_limited_clients: Option<usize>,
}
