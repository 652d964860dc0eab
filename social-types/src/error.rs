//! Error types for the social API.

/// Domain-level errors (input and identity rule violations).
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),
}

/// Credential verification failures.
///
/// These never reach business handlers: the identity middleware turns every
/// variant into a 401 and only logs the specific reason.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("authorization header is missing")]
    Missing,

    #[error("authorization header is malformed")]
    Malformed,

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,

    #[error("token claims are invalid: {0}")]
    InvalidClaims(String),

    #[error("invalid credentials")]
    BadCredentials,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Repository-level errors (data access failures).
///
/// Failures raised by a step inside a transaction are returned with their
/// original variant; `Transaction` is reserved for begin/commit failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("resource not found")]
    NotFound,

    #[error("a user with that email already exists")]
    DuplicateEmail,

    #[error("a user with that username already exists")]
    DuplicateUsername,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("query timed out")]
    Timeout,
}

/// Failures reported by the mail collaborator.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail delivery failed after {attempts} attempts: {reason}")]
    Delivery { attempts: u32, reason: String },
}

/// Application-level errors (for HTTP responses).
///
/// Maps cleanly to HTTP status codes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Domain(DomainError::ValidationError(msg)) => AppError::BadRequest(msg),
            StoreError::Domain(e) => AppError::Internal(e.to_string()),
            StoreError::NotFound => AppError::NotFound("not found".into()),
            e @ (StoreError::DuplicateEmail | StoreError::DuplicateUsername) => {
                AppError::Conflict(e.to_string())
            }
            StoreError::Conflict(msg) => AppError::Conflict(msg),
            StoreError::Database(e) => AppError::Internal(e),
            StoreError::Transaction(e) => AppError::Internal(e),
            e @ StoreError::Timeout => AppError::Internal(e.to_string()),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Signing(msg) => AppError::Internal(msg),
            e => AppError::Unauthorized(e.to_string()),
        }
    }
}

impl From<MailError> for AppError {
    fn from(err: MailError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        StoreError::Domain(err).into()
    }
}
