//! Configuration loading from environment.

use std::{env, str::FromStr, time::Duration};

use anyhow::Context;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub addr: String,
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub env: String,
    pub frontend_url: String,
    pub rate_limiter: RateLimiterConfig,
    pub auth: AuthConfig,
    pub mail: MailConfig,
}

#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    pub enabled: bool,
    pub requests_per_window: u32,
    pub window: Duration,
    /// Key clients by forwarding headers instead of the peer address.
    pub trust_proxy: bool,
}

#[derive(Clone)]
pub struct AuthConfig {
    pub token_secret: String,
    pub token_issuer: String,
    pub token_ttl: chrono::Duration,
    pub basic_user: String,
    pub basic_pass: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token_issuer", &self.token_issuer)
            .field("token_ttl", &self.token_ttl)
            .field("basic_user", &self.basic_user)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct MailConfig {
    pub invitation_ttl: chrono::Duration,
    pub api_url: String,
    pub api_key: String,
    pub from_email: String,
}

impl MailConfig {
    /// Real delivery needs an endpoint, a key and a sender.
    pub fn delivery_enabled(&self) -> bool {
        !self.api_url.is_empty() && !self.api_key.is_empty() && !self.from_email.is_empty()
    }
}

impl std::fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailConfig")
            .field("invitation_ttl", &self.invitation_ttl)
            .field("api_url", &self.api_url)
            .field("from_email", &self.from_email)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through `lookup`, applying defaults for unset keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let text = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let requests_per_window: u32 = typed(&lookup, "RATELIMITER_REQUESTS_COUNT", 20)?;
        if requests_per_window == 0 {
            anyhow::bail!("RATELIMITER_REQUESTS_COUNT must be greater than zero");
        }
        let window_secs: u64 = typed(&lookup, "RATELIMITER_WINDOW_SECS", 5)?;
        if window_secs == 0 {
            anyhow::bail!("RATELIMITER_WINDOW_SECS must be greater than zero");
        }

        Ok(Self {
            addr: text("ADDR", "0.0.0.0"),
            port: typed(&lookup, "PORT", 3000)?,
            database_url,
            db_max_connections: typed(&lookup, "DB_MAX_CONNECTIONS", 30)?,
            env: text("ENV", "development"),
            frontend_url: text("FRONTEND_URL", "http://localhost:5173"),
            rate_limiter: RateLimiterConfig {
                enabled: typed(&lookup, "RATE_LIMITER_ENABLED", true)?,
                requests_per_window,
                window: Duration::from_secs(window_secs),
                trust_proxy: typed(&lookup, "RATE_LIMITER_TRUST_PROXY", true)?,
            },
            auth: AuthConfig {
                token_secret: text("AUTH_TOKEN_SECRET", "example"),
                token_issuer: text("AUTH_TOKEN_ISSUER", "gophersocial"),
                token_ttl: chrono::Duration::hours(typed(&lookup, "AUTH_TOKEN_TTL_HOURS", 72)?),
                basic_user: text("AUTH_BASIC_USER", "admin"),
                basic_pass: text("AUTH_BASIC_PASS", "admin"),
            },
            mail: MailConfig {
                invitation_ttl: chrono::Duration::hours(typed(
                    &lookup,
                    "MAIL_INVITATION_TTL_HOURS",
                    72,
                )?),
                api_url: text("MAIL_API_URL", ""),
                api_key: text("MAIL_API_KEY", ""),
                from_email: text("FROM_EMAIL", ""),
            },
        })
    }

    /// Socket address the server binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.addr, self.port)
    }
}

fn typed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {}: {:?}", key, raw)),
        None => Ok(default),
    }
}
