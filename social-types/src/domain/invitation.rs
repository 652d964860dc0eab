//! Account invitation domain model.

use chrono::{DateTime, Duration, Utc};

use super::UserId;

/// A single-use, time-limited activation credential.
///
/// Only the one-way digest of the raw token is ever stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invitation {
    pub token_hash: String,
    pub user_id: UserId,
    pub expiry: DateTime<Utc>,
}

impl Invitation {
    /// Issues an invitation that expires `ttl` from now.
    pub fn issue(token_hash: String, user_id: UserId, ttl: Duration) -> Self {
        Self {
            token_hash,
            user_id,
            expiry: Utc::now() + ttl,
        }
    }
}
