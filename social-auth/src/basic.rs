//! Static `Authorization: Basic` credentials.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use social_types::AuthError;
use subtle::ConstantTimeEq;

/// Challenge sent with every basic-auth 401.
pub const BASIC_REALM_CHALLENGE: &str = r#"Basic realm="restricted", charset="UTF-8""#;

/// The configured username/password pair guarding operator routes.
#[derive(Clone)]
pub struct BasicCredentials {
    username: String,
    password: String,
}

impl BasicCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Validates an `Authorization` header value against these credentials.
    pub fn validate(&self, header: Option<&str>) -> Result<(), AuthError> {
        let header = match header {
            Some(h) if !h.is_empty() => h,
            _ => return Err(AuthError::Missing),
        };

        let encoded = match header.split_once(' ') {
            Some(("Basic", rest)) if !rest.is_empty() && !rest.contains(' ') => rest,
            _ => return Err(AuthError::Malformed),
        };

        let decoded = BASE64
            .decode(encoded)
            .map_err(|_| AuthError::Malformed)?;
        let decoded = String::from_utf8(decoded).map_err(|_| AuthError::Malformed)?;
        let (user, pass) = decoded.split_once(':').ok_or(AuthError::Malformed)?;

        let user_ok = user.as_bytes().ct_eq(self.username.as_bytes());
        let pass_ok = pass.as_bytes().ct_eq(self.password.as_bytes());

        if bool::from(user_ok & pass_ok) {
            Ok(())
        } else {
            tracing::debug!(username = %user, "basic credentials rejected");
            Err(AuthError::BadCredentials)
        }
    }

    /// Builds the header value a client would send for `user:pass`.
    pub fn header_value(user: &str, pass: &str) -> String {
        format!("Basic {}", BASE64.encode(format!("{user}:{pass}")))
    }
}

impl std::fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}
