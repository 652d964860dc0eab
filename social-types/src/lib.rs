//! # Social Types
//!
//! Domain types and port traits for the social API.
//! This crate has no IO dependencies - only data structures,
//! identity rules, and trait definitions.
//!
//! ## Architecture
//!
//! - `domain/` - Users, roles, invitations, credentials
//! - `ports/` - Trait definitions that adapters must implement
//! - `dto/` - Request/response bodies for the HTTP boundary
//! - `error/` - Auth, store and application error types

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::{Audience, Claims, Invitation, NewUser, PasswordHash, Role, User, UserId};
pub use dto::*;
pub use error::{AppError, AuthError, DomainError, MailError, StoreError};
pub use ports::{MailMessage, Mailer, TokenAuthenticator, UserRepository};
