use axum::http::{header::AUTHORIZATION, HeaderMap};
use tracing::{debug, warn};

use crate::{
    auth::{jwt::JwtKeys, services::AuthService},
    error::{AppError, AuthError, CredentialError},
};

/// The user a request was authenticated as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: i32,
}

/// Outcome of running the guard once for a request. Lives only as long as the request.
#[derive(Debug)]
pub struct Identity(Result<CurrentUser, AppError>);

impl Identity {
    pub fn anonymous() -> Self {
        Self(Err(AuthError::MissingToken.into()))
    }

    pub fn current(&self) -> Result<CurrentUser, &AppError> {
        self.0.as_ref().copied()
    }

    pub fn is_authenticated(&self) -> bool {
        self.0.is_ok()
    }
}

impl From<Result<CurrentUser, AppError>> for Identity {
    fn from(r: Result<CurrentUser, AppError>) -> Self {
        Self(r)
    }
}

/// Pulls the token out of `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingToken)?;

    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)
}

/// Extract, verify, resolve. Built once at startup and shared by every request.
#[derive(Clone)]
pub struct JwtAuthGuard {
    keys: JwtKeys,
    auth: AuthService,
}

impl JwtAuthGuard {
    pub fn new(keys: JwtKeys, auth: AuthService) -> Self {
        Self { keys, auth }
    }

    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<CurrentUser, AppError> {
        let token = bearer_token(headers)?;

        let claims = self.keys.verify(token).map_err(|e| {
            warn!(error = %e, "invalid or expired token");
            AuthError::InvalidToken(e)
        })?;

        let id = match self.auth.validate_user(claims.sub).await {
            Ok(id) => id,
            Err(AppError::Credential(CredentialError::UserNotFound)) => {
                warn!(user_id = claims.sub, "token subject no longer exists");
                return Err(AuthError::UserNotFound.into());
            }
            Err(other) => return Err(other),
        };

        debug!(user_id = id, "request authenticated");
        Ok(CurrentUser { id })
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use axum::http::HeaderValue;

    use super::*;
    use crate::{
        auth::repo::memory::MemoryUserStore, config::JwtConfig, error::TokenError,
    };

    fn keys(secret: &str) -> JwtKeys {
        JwtKeys::from_config(&JwtConfig {
            secret: secret.into(),
            issuer: "iss".into(),
            audience: "aud".into(),
            expires_in: Duration::from_secs(600),
        })
    }

    fn guard() -> (JwtAuthGuard, Arc<MemoryUserStore>) {
        let store = Arc::new(MemoryUserStore::default());
        let keys = keys("guard-secret");
        let auth = AuthService::new(store.clone(), keys.clone());
        (JwtAuthGuard::new(keys, auth), store)
    }

    fn headers(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        h
    }

    #[test]
    fn bearer_token_parsing() {
        assert_eq!(bearer_token(&headers("Bearer abc.def")).unwrap(), "abc.def");
        assert_eq!(bearer_token(&headers("bearer abc")).unwrap(), "abc");
        assert!(matches!(
            bearer_token(&HeaderMap::new()),
            Err(AuthError::MissingToken)
        ));
        assert!(matches!(
            bearer_token(&headers("Basic dXNlcjpwYXNz")),
            Err(AuthError::MissingToken)
        ));
        assert!(matches!(
            bearer_token(&headers("Bearer ")),
            Err(AuthError::MissingToken)
        ));
    }

    #[tokio::test]
    async fn valid_token_resolves_to_current_user() {
        let (guard, store) = guard();
        let user = store.insert("Alice", "a@a.com", None);
        let token = guard.keys.sign(user.id).unwrap();

        let current = guard
            .authenticate(&headers(&format!("Bearer {token}")))
            .await
            .unwrap();
        assert_eq!(current, CurrentUser { id: user.id });
    }

    #[tokio::test]
    async fn missing_header_is_rejected() {
        let (guard, _) = guard();
        let err = guard.authenticate(&HeaderMap::new()).await.unwrap_err();
        assert!(matches!(err, AppError::Auth(AuthError::MissingToken)));
    }

    #[tokio::test]
    async fn foreign_signature_is_rejected() {
        let (guard, store) = guard();
        let user = store.insert("Alice", "a@a.com", None);
        let forged = keys("someone-else").sign(user.id).unwrap();

        let err = guard
            .authenticate(&headers(&format!("Bearer {forged}")))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Auth(AuthError::InvalidToken(TokenError::InvalidSignature))
        ));
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn deleted_user_is_rejected_on_next_request() {
        let (guard, store) = guard();
        let user = store.insert("Gone", "gone@a.com", None);
        let token = guard.keys.sign(user.id).unwrap();
        let h = headers(&format!("Bearer {token}"));

        assert!(guard.authenticate(&h).await.is_ok());
        store.remove(user.id);
        let err = guard.authenticate(&h).await.unwrap_err();
        assert!(matches!(err, AppError::Auth(AuthError::UserNotFound)));
    }

    #[test]
    fn anonymous_identity_has_no_user() {
        let id = Identity::anonymous();
        assert!(!id.is_authenticated());
        assert!(id.current().unwrap_err().is_unauthorized());
    }
}
