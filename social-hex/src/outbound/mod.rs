//! Outbound adapters driven by the service.

pub mod mailer;

pub use mailer::{HttpMailer, LogMailer};
