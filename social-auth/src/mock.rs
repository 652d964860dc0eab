//! Fixed-secret authenticator for tests.

use chrono::{Duration, Utc};
use social_types::{AuthError, Claims, TokenAuthenticator, UserId};

use crate::JwtAuthenticator;

const TEST_SECRET: &str = "test";
const TEST_AUDIENCE: &str = "test-aud";

/// Test double behind the same port as [`JwtAuthenticator`].
///
/// `generate_token` ignores its input and always signs the same claim set for
/// the configured subject, valid for one hour.
pub struct MockAuthenticator {
    subject: UserId,
    inner: JwtAuthenticator,
}

impl MockAuthenticator {
    pub fn new(subject: UserId) -> Self {
        Self {
            subject,
            inner: JwtAuthenticator::new(TEST_SECRET, TEST_AUDIENCE, TEST_AUDIENCE),
        }
    }

    /// Claims every generated token carries.
    pub fn fixed_claims(&self) -> Claims {
        let now = Utc::now().timestamp();
        Claims {
            sub: self.subject.to_string(),
            iss: TEST_AUDIENCE.to_string(),
            aud: TEST_AUDIENCE.into(),
            exp: now + Duration::hours(1).num_seconds(),
            iat: None,
            nbf: None,
        }
    }
}

impl Default for MockAuthenticator {
    fn default() -> Self {
        Self::new(UserId::new(202))
    }
}

impl TokenAuthenticator for MockAuthenticator {
    fn generate_token(&self, _claims: &Claims) -> Result<String, AuthError> {
        self.inner.generate_token(&self.fixed_claims())
    }

    fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        self.inner.validate_token(token)
    }

    fn issuer(&self) -> &str {
        TEST_AUDIENCE
    }

    fn audience(&self) -> &str {
        TEST_AUDIENCE
    }
}
