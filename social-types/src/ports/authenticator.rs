//! Bearer token verification port.
//!
//! Implementations can be real JWT signers, fixed-secret test doubles, etc.

use crate::domain::Claims;
use crate::error::AuthError;

/// Port trait for signing and verifying bearer tokens.
///
/// Validation is a pure function of (token, secret, current time).
pub trait TokenAuthenticator: Send + Sync + 'static {
    /// Signs `claims` into a compact token.
    fn generate_token(&self, claims: &Claims) -> Result<String, AuthError>;

    /// Verifies signature, expiry, issuer and audience.
    fn validate_token(&self, token: &str) -> Result<Claims, AuthError>;

    /// Issuer stamped into freshly minted claims.
    fn issuer(&self) -> &str;

    /// Audience stamped into freshly minted claims.
    fn audience(&self) -> &str;
}
