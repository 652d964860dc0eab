//! # Social Hex
//!
//! Application service layer and HTTP adapter for the social API.
//!
//! ## Architecture
//!
//! - `service/` - Application service (registration, tokens, follows)
//! - `inbound/` - HTTP adapter (Axum server, identity and rate limiting middleware)
//! - `outbound/` - Mail delivery adapters
//!
//! The service is generic over `R: UserRepository`, allowing
//! different repository implementations to be injected.

pub mod inbound;
pub mod outbound;
pub mod service;

#[cfg(test)]
mod service_tests;

pub use service::{ServiceSettings, SocialService};
