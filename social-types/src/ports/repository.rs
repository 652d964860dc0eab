//! Repository port trait.
//!
//! This is the primary port in our hexagonal architecture.
//! Adapters (Postgres, SQLite, in-memory) implement this trait.

use chrono::Duration;

use crate::domain::{NewUser, User, UserId};
use crate::dto::PoolStats;
use crate::error::StoreError;

/// The user store.
///
/// Lifecycle workflows (`create_and_invite`, `activate`, `delete_user`) MUST be
/// atomic: implementations run every step inside one database transaction and
/// either commit all of them or none.
#[async_trait::async_trait]
pub trait UserRepository: Send + Sync + 'static {
    // ─────────────────────────────────────────────────────────────────────────────
    // Lookups
    // ─────────────────────────────────────────────────────────────────────────────

    /// Gets a user by ID, active or not.
    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError>;

    /// Gets a user by email, active or not.
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Lifecycle (MUST be atomic)
    // ─────────────────────────────────────────────────────────────────────────────

    /// Inserts a pending user and an invitation for `raw_token` expiring after
    /// `invitation_ttl`.
    async fn create_and_invite(
        &self,
        user: NewUser,
        raw_token: &str,
        invitation_ttl: Duration,
    ) -> Result<User, StoreError>;

    /// Activates the user owning a non-expired invitation for `raw_token` and
    /// consumes all of that user's invitations.
    async fn activate(&self, raw_token: &str) -> Result<(), StoreError>;

    /// Deletes the user and any remaining invitations.
    async fn delete_user(&self, id: UserId) -> Result<(), StoreError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Followers
    // ─────────────────────────────────────────────────────────────────────────────

    /// Records that `follower` follows `followee`.
    async fn follow(&self, follower: UserId, followee: UserId) -> Result<(), StoreError>;

    /// Removes the follow relationship if it exists.
    async fn unfollow(&self, follower: UserId, followee: UserId) -> Result<(), StoreError>;

    /// Connection pool gauges, for stores backed by a pool.
    fn pool_stats(&self) -> Option<PoolStats> {
        None
    }
}
