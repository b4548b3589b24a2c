use async_graphql::ErrorExtensions;
use thiserror::Error;
use tracing::error;

/// Credential check failures. Both collapse to the same client-facing answer.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("user not found")]
    UserNotFound,
    #[error("invalid password")]
    InvalidPassword,
}

/// JWT verification and signing failures.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    #[error("invalid token signature")]
    InvalidSignature,
    #[error("malformed token or claim mismatch")]
    Invalid,
    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error("token lifetime is out of range")]
    Lifetime,
}

/// Guard rejections.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("invalid token: {0}")]
    InvalidToken(#[from] TokenError),
    #[error("token subject does not exist")]
    UserNotFound,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub const UNAUTHENTICATED: &str = "UNAUTHENTICATED";
const INTERNAL: &str = "INTERNAL_SERVER_ERROR";

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Token(TokenError::Signing(_) | TokenError::Lifetime) => INTERNAL,
            AppError::Credential(_) | AppError::Token(_) | AppError::Auth(_) => UNAUTHENTICATED,
            AppError::BadRequest(_) => "BAD_USER_INPUT",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Database(_) | AppError::Internal(_) => INTERNAL,
        }
    }

    /// Message shown to clients. Authentication failures never say which check failed.
    pub fn public_message(&self) -> String {
        match self.code() {
            UNAUTHENTICATED => "Unauthorized".to_string(),
            INTERNAL => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.code() == UNAUTHENTICATED
    }
}

impl ErrorExtensions for AppError {
    fn extend(&self) -> async_graphql::Error {
        if self.code() == INTERNAL {
            error!(error = %self, "request failed");
        }
        let code = self.code();
        async_graphql::Error::new(self.public_message()).extend_with(|_, e| e.set("code", code))
    }
}
