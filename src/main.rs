mod app;
mod auth;
mod blog;
mod config;
mod db;
mod error;
mod graphql;
mod routes;
mod state;

use crate::{app::build_app, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "blogql=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = AppState::init().await?;
    db::migrate(&app_state.db).await;

    let host = app_state.config.host.clone();
    let port = app_state.config.port;
    let app = build_app(app_state);

    app::serve(app, &host, port).await
}
