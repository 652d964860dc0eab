//! HTTP Server configuration and startup.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    Router, middleware,
    routing::{get, post, put},
};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use social_types::UserRepository;

use super::auth::{basic_auth_middleware, bearer_auth_middleware};
use super::handlers::{self, AppState};
use super::rate_limit::rate_limit_middleware;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// HTTP Server for the social API.
pub struct HttpServer<R: UserRepository> {
    state: Arc<AppState<R>>,
}

impl<R: UserRepository> HttpServer<R> {
    /// Creates a new HTTP server. Rate limiting is mounted only when the
    /// state carries a limiter.
    pub fn new(state: AppState<R>) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    /// Builds the Axum router with all routes under `/v1`.
    pub fn router(&self) -> Router {
        // HTTP metrics are recorded against the global MeterProvider.
        let metrics = axum_otel_metrics::HttpMetricsLayerBuilder::new().build();

        let public = Router::new()
            .route("/health", get(handlers::health::<R>))
            .route("/authentication/user", post(handlers::register_user::<R>))
            .route("/authentication/token", post(handlers::create_token::<R>))
            .route(
                "/users/activate/{token}",
                put(handlers::activate_user::<R>),
            );

        let users = Router::new()
            .route("/users/{id}", get(handlers::get_user::<R>))
            .route("/users/{id}/follow", put(handlers::follow_user::<R>))
            .route("/users/{id}/unfollow", put(handlers::unfollow_user::<R>))
            .route_layer(middleware::from_fn_with_state(
                self.state.clone(),
                bearer_auth_middleware::<R>,
            ));

        let operations = Router::new()
            .route("/debug/stats", get(handlers::debug_stats::<R>))
            .route_layer(middleware::from_fn_with_state(
                self.state.clone(),
                basic_auth_middleware::<R>,
            ));

        let mut router = Router::new()
            .nest("/v1", public.merge(users).merge(operations))
            .layer(metrics)
            .layer(TimeoutLayer::new(REQUEST_TIMEOUT));

        if let Some(limiter) = &self.state.limiter {
            router = router.layer(middleware::from_fn_with_state(
                limiter.clone(),
                rate_limit_middleware,
            ));
        }

        router
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Runs the server on the given address with graceful shutdown.
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", listener.local_addr()?);

        axum::serve(
            listener,
            self.router()
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
