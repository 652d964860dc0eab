//! Outbound mail port.

use crate::error::MailError;

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub to_name: String,
    pub to_email: String,
    pub subject: String,
    pub body: String,
}

/// Port trait for mail delivery.
#[async_trait::async_trait]
pub trait Mailer: Send + Sync + 'static {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError>;
}
