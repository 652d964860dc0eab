//! User (principal) domain model.

use argon2::{
    Argon2,
    password_hash::{self, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::role::Role;
use crate::error::DomainError;

/// Unique identifier for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    /// Wraps a raw database identifier.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw identifier.
    pub fn get(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// An argon2 PHC string. Never serialized, never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Hashes a plaintext password with a fresh salt.
    pub fn hash(plain: &str) -> Result<Self, DomainError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| DomainError::PasswordHash(e.to_string()))?;
        Ok(Self(hash.to_string()))
    }

    /// Rebuilds a hash loaded from storage.
    pub fn from_stored(hash: String) -> Self {
        Self(hash)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Checks a plaintext password. Unparseable stored hashes never match.
    pub fn verify(&self, plain: &str) -> bool {
        match password_hash::PasswordHash::new(&self.0) {
            Ok(parsed) => Argon2::default()
                .verify_password(plain.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }
}

impl std::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasswordHash(..)")
    }
}

/// The authenticated actor behind a request.
///
/// Loaded from the store per request and treated as an immutable snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(skip)]
    pub password: PasswordHash,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
    pub role: Role,
}

/// A user that has not been persisted yet.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: PasswordHash,
    /// Role name; `None` resolves to [`Role::DEFAULT_NAME`].
    pub role: Option<String>,
}

impl NewUser {
    /// Creates a new user, validating username and email.
    pub fn new(username: String, email: String, password: PasswordHash) -> Result<Self, DomainError> {
        let username = username.trim().to_string();
        let email = email.trim().to_string();

        if username.is_empty() || username.len() > 100 {
            return Err(DomainError::ValidationError(
                "username must be between 1 and 100 characters".into(),
            ));
        }

        if email.len() > 255 || !email.contains('@') {
            return Err(DomainError::ValidationError(
                "email must be a valid address".into(),
            ));
        }

        Ok(Self {
            username,
            email,
            password,
            role: None,
        })
    }

    /// Overrides the role resolved at insert time.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Role name used when inserting the row.
    pub fn role_name(&self) -> &str {
        self.role.as_deref().unwrap_or(Role::DEFAULT_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = PasswordHash::hash("hunter22").unwrap();
        assert!(hash.verify("hunter22"));
        assert!(!hash.verify("hunter23"));
    }

    #[test]
    fn test_stored_garbage_never_verifies() {
        let hash = PasswordHash::from_stored("not-a-phc-string".into());
        assert!(!hash.verify("anything"));
    }

    #[test]
    fn test_password_hash_is_redacted() {
        let hash = PasswordHash::from_stored("$argon2id$secret".into());
        assert_eq!(format!("{:?}", hash), "PasswordHash(..)");
    }

    #[test]
    fn test_new_user_validation() {
        let pw = PasswordHash::from_stored(String::new());
        assert!(NewUser::new("  ".into(), "a@b.c".into(), pw.clone()).is_err());
        assert!(NewUser::new("alice".into(), "not-an-email".into(), pw.clone()).is_err());

        let user = NewUser::new(" alice ".into(), "alice@example.com".into(), pw).unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.role_name(), "user");
        assert_eq!(user.with_role("admin").role_name(), "admin");
    }

    #[test]
    fn test_user_id_parse() {
        assert_eq!("42".parse::<UserId>().unwrap(), UserId::new(42));
        assert!("abc".parse::<UserId>().is_err());
        assert!("99999999999999999999".parse::<UserId>().is_err());
    }
}
