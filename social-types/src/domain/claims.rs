//! Bearer token claims.

use chrono::{Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::UserId;

/// Registered JWT claims carried by every bearer token.
///
/// `sub` is the decimal user id. Tokens minted elsewhere may carry it as a
/// JSON number, so both forms are accepted. `iat` and `nbf` are optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(deserialize_with = "subject_from_string_or_number")]
    pub sub: String,
    pub iss: String,
    pub aud: Audience,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
}

/// The `aud` claim: a single string or an array of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Many(Vec<String>),
}

impl From<&str> for Audience {
    fn from(aud: &str) -> Self {
        Self::Single(aud.to_string())
    }
}

impl Claims {
    /// Builds claims for `user_id` valid from now until `now + ttl`.
    pub fn for_user(user_id: UserId, issuer: &str, audience: &str, ttl: Duration) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: user_id.to_string(),
            iss: issuer.to_string(),
            aud: audience.into(),
            exp: now + ttl.num_seconds(),
            iat: Some(now),
            nbf: Some(now),
        }
    }

    /// Parses the subject into a user id.
    pub fn subject_id(&self) -> Result<UserId, std::num::ParseIntError> {
        self.sub.parse()
    }
}

fn subject_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Subject {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Subject::deserialize(deserializer)? {
        Subject::Text(s) => s,
        Subject::Number(n) => n.to_string(),
    })
}
