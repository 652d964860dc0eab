//! Social Application Service
//!
//! Orchestrates registration, activation, token issuance and follows
//! through the repository, mailer and authenticator ports.
//! Contains NO infrastructure logic - pure business orchestration.

use std::sync::Arc;

use chrono::Duration;
use social_types::{
    AppError, Claims, CreateTokenRequest, DomainError, Mailer, NewUser, PasswordHash,
    RegisterUserRequest, TokenAuthenticator, TokenResponse, User, UserId, UserRepository,
    UserWithToken,
};

use crate::outbound::mailer::invitation_message;

/// Tunables the service needs from configuration.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// How long an invitation stays redeemable.
    pub invitation_ttl: Duration,
    /// Lifetime of issued bearer tokens.
    pub token_ttl: Duration,
    /// Base URL of the web client, used in activation links.
    pub frontend_url: String,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            invitation_ttl: Duration::hours(72),
            token_ttl: Duration::hours(72),
            frontend_url: "http://localhost:5173".into(),
        }
    }
}

/// Application service for user lifecycle operations.
///
/// Generic over `R: UserRepository` - the adapter is injected at compile time.
/// The mailer and authenticator are trait objects so tests can swap them
/// without changing the service type.
pub struct SocialService<R: UserRepository> {
    repo: R,
    mailer: Arc<dyn Mailer>,
    authenticator: Arc<dyn TokenAuthenticator>,
    settings: ServiceSettings,
}

impl<R: UserRepository> SocialService<R> {
    pub fn new(
        repo: R,
        mailer: Arc<dyn Mailer>,
        authenticator: Arc<dyn TokenAuthenticator>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            repo,
            mailer,
            authenticator,
            settings,
        }
    }

    /// Returns a reference to the underlying repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn authenticator(&self) -> &dyn TokenAuthenticator {
        self.authenticator.as_ref()
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Registration
    // ─────────────────────────────────────────────────────────────────────────────

    /// Registers a pending user and mails the invitation.
    ///
    /// If the mail cannot be delivered the freshly created user is deleted
    /// again so the email and username can be reused.
    pub async fn register(&self, req: RegisterUserRequest) -> Result<UserWithToken, AppError> {
        req.validate()?;

        let password = hash_password(req.password).await?;
        let new_user = NewUser::new(req.username, req.email, password)?;
        let token = social_repo::security::generate_invitation_token();

        let user = self
            .repo
            .create_and_invite(new_user, &token, self.settings.invitation_ttl)
            .await?;

        let activation_url = format!(
            "{}/confirm/{}",
            self.settings.frontend_url.trim_end_matches('/'),
            token
        );
        let message = invitation_message(&user, &activation_url);

        if let Err(mail_err) = self.mailer.send(&message).await {
            tracing::error!(user_id = %user.id, error = %mail_err, "invitation mail failed, rolling back user");

            if let Err(delete_err) = self.repo.delete_user(user.id).await {
                tracing::error!(user_id = %user.id, error = %delete_err, "failed to delete user after mail failure");
            }

            return Err(mail_err.into());
        }

        tracing::info!(user_id = %user.id, "user registered, invitation sent");
        Ok(UserWithToken { user, token })
    }

    /// Activates the user owning the invitation token.
    pub async fn activate(&self, token: &str) -> Result<(), AppError> {
        self.repo.activate(token).await.map_err(Into::into)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Tokens
    // ─────────────────────────────────────────────────────────────────────────────

    /// Exchanges email and password for a signed bearer token.
    pub async fn create_token(&self, req: CreateTokenRequest) -> Result<TokenResponse, AppError> {
        let user = match self.repo.get_user_by_email(&req.email).await? {
            Some(user) if user.is_active => user,
            _ => return Err(AppError::Unauthorized("invalid credentials".into())),
        };

        if !verify_password(user.password.clone(), req.password).await? {
            return Err(AppError::Unauthorized("invalid credentials".into()));
        }

        let claims = Claims::for_user(
            user.id,
            self.authenticator.issuer(),
            self.authenticator.audience(),
            self.settings.token_ttl,
        );
        let token = self.authenticator.generate_token(&claims)?;

        Ok(TokenResponse { token })
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Users
    // ─────────────────────────────────────────────────────────────────────────────

    /// Gets an active user by ID. Pending users are reported as missing.
    pub async fn get_active_user(&self, id: UserId) -> Result<User, AppError> {
        match self.repo.get_user(id).await? {
            Some(user) if user.is_active => Ok(user),
            _ => Err(AppError::NotFound(format!("user {}", id))),
        }
    }

    pub async fn follow(&self, follower: &User, followee: UserId) -> Result<(), AppError> {
        if follower.id == followee {
            return Err(AppError::BadRequest("users cannot follow themselves".into()));
        }

        self.repo
            .follow(follower.id, followee)
            .await
            .map_err(Into::into)
    }

    pub async fn unfollow(&self, follower: &User, followee: UserId) -> Result<(), AppError> {
        self.repo
            .unfollow(follower.id, followee)
            .await
            .map_err(Into::into)
    }
}

// Argon2 is CPU-bound; keep it off the async workers.

async fn hash_password(plain: String) -> Result<PasswordHash, AppError> {
    let hashed = tokio::task::spawn_blocking(move || PasswordHash::hash(&plain))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    hashed.map_err(|e: DomainError| e.into())
}

async fn verify_password(hash: PasswordHash, plain: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || hash.verify(&plain))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))
}
