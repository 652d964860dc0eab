//! Mail delivery adapters and the invitation template.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use social_types::{MailError, MailMessage, Mailer, User};

const MAX_ATTEMPTS: u32 = 3;

/// Renders the invitation sent right after registration.
pub fn invitation_message(user: &User, activation_url: &str) -> MailMessage {
    MailMessage {
        to_name: user.username.clone(),
        to_email: user.email.clone(),
        subject: "Finish Registration with GopherSocial".into(),
        body: format!(
            "<p>Hi {name},</p>\
             <p>Thanks for signing up for GopherSocial. Please confirm your email \
             to activate your account:</p>\
             <p><a href=\"{url}\">{url}</a></p>\
             <p>If you didn't sign up, you can safely ignore this email.</p>",
            name = user.username,
            url = activation_url,
        ),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP mail API
// ─────────────────────────────────────────────────────────────────────────────

/// Sends mail through a JSON HTTP API authenticated with a bearer key.
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from_email: String,
    backoff: Duration,
}

impl HttpMailer {
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        from_email: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            api_url: api_url.into(),
            api_key: api_key.into(),
            from_email: from_email.into(),
            backoff: Duration::from_secs(1),
        }
    }

    /// Overrides the initial retry delay (doubled after each failure).
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    async fn deliver(&self, message: &MailMessage) -> Result<(), String> {
        let payload = json!({
            "from": { "email": self.from_email, "name": "GopherSocial" },
            "to": [{ "email": message.to_email, "name": message.to_name }],
            "subject": message.subject,
            "html": message.body,
        });

        self.client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        let mut delay = self.backoff;
        let mut last_error = String::new();

        for attempt in 1..=MAX_ATTEMPTS {
            match self.deliver(message).await {
                Ok(()) => {
                    tracing::info!(to = %message.to_email, attempt, "mail sent");
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(to = %message.to_email, attempt, error = %e, "mail delivery attempt failed");
                    last_error = e;
                }
            }

            if attempt < MAX_ATTEMPTS {
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }

        Err(MailError::Delivery {
            attempts: MAX_ATTEMPTS,
            reason: last_error,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Log-only mailer
// ─────────────────────────────────────────────────────────────────────────────

/// Logs messages instead of sending them. Used when no mail API is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        // The body carries the activation token, so it stays out of info logs.
        tracing::info!(
            to = %message.to_email,
            subject = %message.subject,
            "mail delivery disabled, message logged"
        );
        tracing::debug!(to = %message.to_email, body = %message.body, "mail body");
        Ok(())
    }
}
