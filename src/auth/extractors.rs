use std::convert::Infallible;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use super::guard::Identity;
use crate::state::AppState;

/// Runs the guard for this request. Never rejects on its own: the outcome is carried
/// into the GraphQL context and protected fields decide.
#[async_trait]
impl FromRequestParts<AppState> for Identity {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key(axum::http::header::AUTHORIZATION) {
            return Ok(Identity::anonymous());
        }
        Ok(state.guard.authenticate(&parts.headers).await.into())
    }
}
