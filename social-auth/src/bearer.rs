//! `Authorization: Bearer` header parsing.

use social_types::AuthError;

/// Extracts the token from an `Authorization` header value.
///
/// The value must be exactly two space-separated parts with scheme `Bearer`.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let header = match header {
        Some(h) if !h.is_empty() => h,
        _ => return Err(AuthError::Missing),
    };

    let mut parts = header.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Ok(token),
        _ => Err(AuthError::Malformed),
    }
}
