use async_graphql::{http::GraphiQLSource, ServerError};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
    Extension, Json, Router,
};
use tracing::{debug, warn};

use crate::{
    auth::Identity,
    error::UNAUTHENTICATED,
    graphql::BlogSchema,
    state::AppState,
};

pub fn graphql_routes() -> Router<AppState> {
    Router::new().route("/graphql", get(graphiql).post(graphql_handler))
}

async fn graphiql() -> impl IntoResponse {
    Html(GraphiQLSource::build().endpoint("/graphql").finish())
}

fn is_unauthenticated(err: &ServerError) -> bool {
    err.extensions
        .as_ref()
        .and_then(|ext| ext.get("code"))
        .is_some_and(|code| *code == async_graphql::Value::from(UNAUTHENTICATED))
}

/// Executes one GraphQL operation with the guard outcome attached. Any authentication
/// failure in the operation turns the whole response into a 401.
pub async fn graphql_handler(
    Extension(schema): Extension<BlogSchema>,
    identity: Identity,
    Json(req): Json<async_graphql::Request>,
) -> impl IntoResponse {
    debug!(authenticated = identity.is_authenticated(), "graphql request");
    let resp = schema.execute(req.data(identity)).await;

    let status = if resp.errors.iter().any(is_unauthenticated) {
        warn!("request rejected as unauthenticated");
        StatusCode::UNAUTHORIZED
    } else {
        StatusCode::OK
    };
    (status, Json(resp))
}
