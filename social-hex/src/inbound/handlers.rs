//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{FromRequest, Path, Request, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use social_auth::BasicCredentials;
use social_types::{
    AppError, CreateTokenRequest, DebugStats, HealthResponse, RegisterUserRequest, UserId,
    UserRepository,
};

use super::auth::AuthenticatedUser;
use super::rate_limit::FixedWindowLimiter;
use crate::SocialService;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application state shared across handlers and middleware.
pub struct AppState<R: UserRepository> {
    pub service: SocialService<R>,
    /// Credentials guarding operational routes.
    pub basic: BasicCredentials,
    /// Present only when rate limiting is enabled.
    pub limiter: Option<Arc<FixedWindowLimiter>>,
    pub env: String,
}

impl<R: UserRepository> AppState<R> {
    pub fn new(service: SocialService<R>, basic: BasicCredentials) -> Self {
        Self {
            service,
            basic,
            limiter: None,
            env: "development".into(),
        }
    }

    pub fn with_rate_limiter(mut self, limiter: Arc<FixedWindowLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn with_env(mut self, env: impl Into<String>) -> Self {
        self.env = env.into();
        self
    }
}

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self.0 {
            AppError::BadRequest(msg) => {
                tracing::warn!(error = %msg, "bad request");
                (StatusCode::BAD_REQUEST, msg)
            }
            AppError::Unauthorized(reason) => {
                tracing::warn!(reason = %reason, "unauthorized");
                (StatusCode::UNAUTHORIZED, "unauthorized".to_string())
            }
            AppError::NotFound(msg) => {
                tracing::warn!(error = %msg, "not found");
                (StatusCode::NOT_FOUND, "not found".to_string())
            }
            AppError::Conflict(msg) => {
                tracing::warn!(error = %msg, "conflict");
                (StatusCode::CONFLICT, msg)
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "the server encountered a problem".to_string(),
                )
            }
        };

        let body = serde_json::json!({
            "error": message,
            "code": status.as_u16()
        });

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(AppError::BadRequest(rejection.body_text()))
    }
}

/// `Json` extractor whose rejections render as [`ApiError`] bodies.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

fn parse_user_id(raw: &str) -> Result<UserId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError(AppError::BadRequest("invalid user id".into())))
}

// ─────────────────────────────────────────────────────────────────────────────
// Operational
// ─────────────────────────────────────────────────────────────────────────────

/// Health check endpoint.
pub async fn health<R: UserRepository>(State(state): State<Arc<AppState<R>>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".into(),
        env: state.env.clone(),
        version: VERSION.into(),
    })
}

/// Pool and limiter statistics, behind basic auth.
pub async fn debug_stats<R: UserRepository>(
    State(state): State<Arc<AppState<R>>>,
) -> impl IntoResponse {
    Json(DebugStats {
        version: VERSION.into(),
        database: state.service.repo().pool_stats(),
        rate_limited_clients: state.limiter.as_ref().map(|l| l.tracked_keys()),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Authentication
// ─────────────────────────────────────────────────────────────────────────────

/// Register a pending user and send the invitation.
#[tracing::instrument(skip(state, req), fields(username = %req.username))]
pub async fn register_user<R: UserRepository>(
    State(state): State<Arc<AppState<R>>>,
    ApiJson(req): ApiJson<RegisterUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let created = state.service.register(req).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Exchange credentials for a bearer token.
#[tracing::instrument(skip(state, req))]
pub async fn create_token<R: UserRepository>(
    State(state): State<Arc<AppState<R>>>,
    ApiJson(req): ApiJson<CreateTokenRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let token = state.service.create_token(req).await?;
    Ok((StatusCode::CREATED, Json(token)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────────────────────────

#[tracing::instrument(skip(state, token))]
pub async fn activate_user<R: UserRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.service.activate(&token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Get an active user by ID.
#[tracing::instrument(skip(state, _caller), fields(user_id = %id))]
pub async fn get_user<R: UserRepository>(
    State(state): State<Arc<AppState<R>>>,
    _caller: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.service.get_active_user(parse_user_id(&id)?).await?;
    Ok(Json(user))
}

#[tracing::instrument(skip(state, caller), fields(follower = %caller.0.id, followee = %id))]
pub async fn follow_user<R: UserRepository>(
    State(state): State<Arc<AppState<R>>>,
    caller: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.service.follow(&caller.0, parse_user_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip(state, caller), fields(follower = %caller.0.id, followee = %id))]
pub async fn unfollow_user<R: UserRepository>(
    State(state): State<Arc<AppState<R>>>,
    caller: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.service.unfollow(&caller.0, parse_user_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}
