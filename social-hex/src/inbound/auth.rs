//! Identity middleware: bearer tokens for user routes, basic auth for
//! operational routes.

use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::{FromRequestParts, State},
    http::{HeaderValue, Request, StatusCode, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};

use social_auth::{BASIC_REALM_CHALLENGE, bearer_token};
use social_types::{AppError, AuthError, User, UserRepository};

use super::handlers::{ApiError, AppState};

/// The user behind a bearer-authenticated request.
///
/// Inserted by [`bearer_auth_middleware`]; handlers take it as an extractor.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S: Send + Sync> FromRequestParts<S> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| {
                tracing::error!(path = %parts.uri.path(), "route reached without an authenticated user");
                ApiError(AppError::Internal(
                    "authenticated user missing from request".into(),
                ))
            })
    }
}

fn authorization(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

/// Resolves a bearer header to an active user.
///
/// Unknown and inactive users are reported as unauthorized, never as missing.
async fn resolve_bearer<R: UserRepository>(
    state: &AppState<R>,
    header: Option<&str>,
) -> Result<User, AppError> {
    let token = bearer_token(header)?;
    let claims = state.service.authenticator().validate_token(token)?;
    let user_id = claims.subject_id().map_err(|_| AuthError::Malformed)?;

    match state.service.repo().get_user(user_id).await? {
        Some(user) if user.is_active => Ok(user),
        Some(_) => Err(AppError::Unauthorized(format!("user {} is not active", user_id))),
        None => Err(AppError::Unauthorized(format!("user {} not found", user_id))),
    }
}

/// Bearer authentication middleware.
///
/// On success the user is attached to the request as [`AuthenticatedUser`].
pub async fn bearer_auth_middleware<R: UserRepository>(
    State(state): State<Arc<AppState<R>>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    // Owned copy: the request body is not `Sync`, so no borrow of it may
    // live across the lookup.
    let header = authorization(&request).map(str::to_owned);
    let resolved = resolve_bearer(&state, header.as_deref()).await;

    match resolved {
        Ok(user) => {
            request.extensions_mut().insert(AuthenticatedUser(user));
            next.run(request).await
        }
        Err(AppError::Unauthorized(reason)) => {
            tracing::warn!(
                reason = %reason,
                method = %request.method(),
                path = %request.uri().path(),
                "bearer authentication failed"
            );
            unauthorized_response(None)
        }
        Err(e) => ApiError(e).into_response(),
    }
}

/// Basic authentication middleware for operational routes.
pub async fn basic_auth_middleware<R: UserRepository>(
    State(state): State<Arc<AppState<R>>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if let Err(reason) = state.basic.validate(authorization(&request)) {
        tracing::warn!(
            reason = %reason,
            method = %request.method(),
            path = %request.uri().path(),
            "basic authentication failed"
        );
        return unauthorized_response(Some(BASIC_REALM_CHALLENGE));
    }

    next.run(request).await
}

fn unauthorized_response(challenge: Option<&'static str>) -> Response {
    let mut response = (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": "unauthorized",
            "code": 401
        })),
    )
        .into_response();

    if let Some(challenge) = challenge {
        response.headers_mut().insert(
            header::WWW_AUTHENTICATE,
            HeaderValue::from_static(challenge),
        );
    }

    response
}
