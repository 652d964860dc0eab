//! # Social Auth
//!
//! Credential verification for the social API.
//!
//! - [`JwtAuthenticator`] signs and validates HS256 bearer tokens against a
//!   shared secret, issuer and audience.
//! - [`MockAuthenticator`] implements the same port with a fixed test secret
//!   and deterministic claims.
//! - [`BasicCredentials`] checks `Authorization: Basic` headers against a
//!   static username/password pair.
//!
//! Everything here is stateless apart from the configured secrets; none of
//! it touches the store.
//!
//! # Example
//! ```
//! use chrono::Duration;
//! use social_auth::JwtAuthenticator;
//! use social_types::{Claims, TokenAuthenticator, UserId};
//!
//! let auth = JwtAuthenticator::new("secret", "social", "social");
//! let claims = Claims::for_user(UserId::new(1), auth.issuer(), auth.audience(), Duration::hours(1));
//! let token = auth.generate_token(&claims).unwrap();
//! assert_eq!(auth.validate_token(&token).unwrap().sub, "1");
//! ```

mod basic;
mod bearer;
mod jwt;
mod mock;

pub use basic::{BASIC_REALM_CHALLENGE, BasicCredentials};
pub use bearer::bearer_token;
pub use jwt::JwtAuthenticator;
pub use mock::MockAuthenticator;
