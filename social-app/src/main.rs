//! # Social Application
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Initialize the repository adapter
//! - Create the social service with its mailer and authenticator
//! - Start the HTTP server with identity and rate limiting middleware

mod config;

use std::sync::Arc;
use std::time::Duration;

use opentelemetry::global;
use opentelemetry_sdk::{
    metrics::SdkMeterProvider, propagation::TraceContextPropagator, trace as sdktrace,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use social_auth::{BasicCredentials, JwtAuthenticator};
use social_hex::{
    ServiceSettings, SocialService,
    inbound::{AppState, FixedWindowLimiter, HttpServer},
    outbound::{HttpMailer, LogMailer},
};
use social_repo::build_repo;
use social_types::Mailer;

/// Builds the OTLP exporter when `OTEL_EXPORTER_OTLP_ENDPOINT` is set.
fn init_tracer() -> anyhow::Result<Option<(sdktrace::Tracer, sdktrace::SdkTracerProvider)>> {
    if std::env::var_os("OTEL_EXPORTER_OTLP_ENDPOINT").is_none() {
        return Ok(None);
    }

    global::set_text_map_propagator(TraceContextPropagator::new());

    // Use gRPC exporter with batch processing (non-blocking)
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .build()?;

    let provider = sdktrace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .build();

    global::set_tracer_provider(provider.clone());

    use opentelemetry::trace::TracerProvider as _;
    Ok(Some((provider.tracer("social-service"), provider)))
}

/// Exports HTTP metrics over OTLP when `OTEL_EXPORTER_OTLP_ENDPOINT` is set.
/// Without it the metrics layer records into the no-op global provider.
fn init_meter() -> anyhow::Result<Option<SdkMeterProvider>> {
    if std::env::var_os("OTEL_EXPORTER_OTLP_ENDPOINT").is_none() {
        return Ok(None);
    }

    let exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .build()?;

    let provider = SdkMeterProvider::builder()
        .with_periodic_exporter(exporter)
        .build();

    global::set_meter_provider(provider.clone());
    Ok(Some(provider))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let (telemetry, otel_provider) = match init_tracer()? {
        Some((tracer, provider)) => (
            Some(tracing_opentelemetry::layer().with_tracer(tracer)),
            Some(provider),
        ),
        None => (None, None),
    };
    let meter_provider = init_meter()?;

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,social_app=debug,social_hex=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(telemetry)
        .init();

    // Load configuration
    let config = config::Config::from_env()?;

    tracing::info!(env = %config.env, "Starting social server on {}", config.bind_addr());
    tracing::info!(
        backend = config.database_url.split(':').next().unwrap_or_default(),
        max_connections = config.db_max_connections,
        "Connecting to database"
    );

    // Build repository (handles connection and migration)
    let repo = build_repo(&config.database_url, config.db_max_connections).await?;

    let mailer: Arc<dyn Mailer> = if config.mail.delivery_enabled() {
        Arc::new(HttpMailer::new(
            config.mail.api_url.clone(),
            config.mail.api_key.clone(),
            config.mail.from_email.clone(),
        ))
    } else {
        tracing::warn!("mail API not configured, invitations will only be logged");
        Arc::new(LogMailer)
    };

    let authenticator = Arc::new(JwtAuthenticator::new(
        &config.auth.token_secret,
        &config.auth.token_issuer,
        &config.auth.token_issuer,
    ));

    let service = SocialService::new(
        repo,
        mailer,
        authenticator,
        ServiceSettings {
            invitation_ttl: config.mail.invitation_ttl,
            token_ttl: config.auth.token_ttl,
            frontend_url: config.frontend_url.clone(),
        },
    );

    let mut state = AppState::new(
        service,
        BasicCredentials::new(config.auth.basic_user.clone(), config.auth.basic_pass.clone()),
    )
    .with_env(config.env.clone());

    if config.rate_limiter.enabled {
        let limiter = Arc::new(
            FixedWindowLimiter::new(
                config.rate_limiter.requests_per_window,
                config.rate_limiter.window,
            )
            .trust_forwarded_headers(config.rate_limiter.trust_proxy),
        );
        limiter.spawn_sweeper(config.rate_limiter.window.max(Duration::from_secs(1)));
        tracing::info!(
            requests = config.rate_limiter.requests_per_window,
            window_secs = config.rate_limiter.window.as_secs(),
            trust_proxy = config.rate_limiter.trust_proxy,
            "rate limiter enabled"
        );
        state = state.with_rate_limiter(limiter);
    }

    // Create and run the HTTP server
    HttpServer::new(state).run(&config.bind_addr()).await?;

    // Ensure traces and metrics are flushed before exit
    if let Some(provider) = otel_provider {
        let _ = provider.shutdown();
    }
    if let Some(provider) = meter_provider {
        let _ = provider.shutdown();
    }
    Ok(())
}
