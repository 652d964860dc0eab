//! HS256 JWT authenticator.

use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use social_types::{AuthError, Claims, TokenAuthenticator};

/// Signs and validates bearer tokens with a shared HMAC secret.
pub struct JwtAuthenticator {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    issuer: String,
    audience: String,
}

impl JwtAuthenticator {
    pub fn new(secret: &str, issuer: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_nbf = true;
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            issuer: issuer.to_string(),
            audience: audience.to_string(),
        }
    }
}

impl std::fmt::Debug for JwtAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtAuthenticator")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish_non_exhaustive()
    }
}

impl TokenAuthenticator for JwtAuthenticator {
    fn generate_token(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| classify(e.kind()))
    }

    fn issuer(&self) -> &str {
        &self.issuer
    }

    fn audience(&self) -> &str {
        &self.audience
    }
}

fn classify(kind: &ErrorKind) -> AuthError {
    match kind {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => AuthError::InvalidSignature,
        ErrorKind::ExpiredSignature => AuthError::Expired,
        ErrorKind::InvalidIssuer => AuthError::InvalidClaims("issuer".into()),
        ErrorKind::InvalidAudience => AuthError::InvalidClaims("audience".into()),
        ErrorKind::ImmatureSignature => AuthError::InvalidClaims("not yet valid".into()),
        ErrorKind::MissingRequiredClaim(claim) => AuthError::InvalidClaims(claim.clone()),
        _ => AuthError::Malformed,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use social_types::UserId;

    use serde_json::json;
    use social_types::Audience;

    use super::*;

    fn authenticator(secret: &str) -> JwtAuthenticator {
        JwtAuthenticator::new(secret, "gophersocial", "gophersocial")
    }

    fn claims(ttl: Duration) -> Claims {
        Claims::for_user(UserId::new(42), "gophersocial", "gophersocial", ttl)
    }

    #[test]
    fn test_roundtrip_before_expiry() {
        let auth = authenticator("s3cret");
        let token = auth.generate_token(&claims(Duration::hours(1))).unwrap();

        let validated = auth.validate_token(&token).unwrap();
        assert_eq!(validated.subject_id().unwrap(), UserId::new(42));
        assert_eq!(validated.iss, "gophersocial");
    }

    #[test]
    fn test_expired_token() {
        let auth = authenticator("s3cret");
        let mut expired = claims(Duration::hours(1));
        let past = Utc::now().timestamp() - 120;
        expired.iat = Some(past - 60);
        expired.nbf = Some(past - 60);
        expired.exp = past;

        let token = auth.generate_token(&expired).unwrap();
        assert_eq!(auth.validate_token(&token), Err(AuthError::Expired));
    }

    #[test]
    fn test_wrong_secret() {
        let token = authenticator("s3cret")
            .generate_token(&claims(Duration::hours(1)))
            .unwrap();

        assert_eq!(
            authenticator("other").validate_token(&token),
            Err(AuthError::InvalidSignature)
        );
    }

    #[test]
    fn test_wrong_issuer_and_audience() {
        let auth = authenticator("s3cret");

        let mut foreign = claims(Duration::hours(1));
        foreign.iss = "someone-else".into();
        let token = auth.generate_token(&foreign).unwrap();
        assert!(matches!(
            auth.validate_token(&token),
            Err(AuthError::InvalidClaims(_))
        ));

        let mut foreign = claims(Duration::hours(1));
        foreign.aud = Audience::Single("someone-else".into());
        let token = auth.generate_token(&foreign).unwrap();
        assert!(matches!(
            auth.validate_token(&token),
            Err(AuthError::InvalidClaims(_))
        ));
    }

    fn sign_raw(secret: &str, claims: &serde_json::Value) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_registered_claims_only_validate() {
        let auth = authenticator("s3cret");
        let exp = Utc::now().timestamp() + 3600;

        let token = sign_raw(
            "s3cret",
            &json!({"sub": 7, "iss": "gophersocial", "aud": "gophersocial", "exp": exp}),
        );
        let claims = auth.validate_token(&token).unwrap();
        assert_eq!(claims.subject_id().unwrap(), UserId::new(7));
        assert_eq!(claims.nbf, None);

        let token = sign_raw(
            "s3cret",
            &json!({"sub": "7", "iss": "gophersocial", "aud": ["gophersocial"], "exp": exp}),
        );
        assert!(auth.validate_token(&token).is_ok());

        let token = sign_raw(
            "s3cret",
            &json!({"sub": "7", "iss": "gophersocial", "aud": ["elsewhere"], "exp": exp}),
        );
        assert!(matches!(
            auth.validate_token(&token),
            Err(AuthError::InvalidClaims(_))
        ));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let auth = authenticator("s3cret");
        assert_eq!(auth.validate_token("not-a-jwt"), Err(AuthError::Malformed));
        assert_eq!(auth.validate_token(""), Err(AuthError::Malformed));
    }
}
