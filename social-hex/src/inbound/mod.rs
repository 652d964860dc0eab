//! HTTP Inbound Adapter
//!
//! Axum-based HTTP server that drives the application layer.

mod auth;
mod handlers;
pub mod rate_limit;
mod server;

pub use auth::AuthenticatedUser;
pub use handlers::{ApiError, ApiJson, AppState};
pub use rate_limit::{Admission, FixedWindowLimiter};
pub use server::HttpServer;
