//! Port traits (interfaces for adapters).
//!
//! These are the contracts that adapters must implement.
//! The application layer depends on these traits, not concrete implementations.

mod authenticator;
mod mailer;
mod repository;

pub use authenticator::TokenAuthenticator;
pub use mailer::{MailMessage, Mailer};
pub use repository::UserRepository;
