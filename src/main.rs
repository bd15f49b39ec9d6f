use std::sync::Arc;
use std::time::Duration;

mod admin;
mod app;
mod auth;
mod bootstrap;
mod config;
mod db;
mod diagnostics;
mod donations;
mod error;
mod state;
mod users;
mod views;

#[cfg(test)]
mod testing;

use crate::config::AppConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "donations=debug,axum=info,tower_http=info".to_string());
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

    let config = Arc::new(AppConfig::from_env()?);
    tracing::info!(
        database_host = config.database_host(),
        port = config.port,
        session_ttl_hours = config.session.ttl_hours,
        cookie_secure = config.session.cookie_secure,
        "configuration loaded"
    );

    let db = db::connect(&config).await?;
    db::migrate(&db).await?;

    let state = AppState::from_pool(db, config.clone());
    bootstrap::ensure_default_admin(state.users.as_ref(), &config.bootstrap).await?;

    let _sweeper = auth::session::spawn_sweeper(
        state.sessions.clone(),
        Duration::from_secs(config.session.sweep_secs),
    );

    app::serve(app::build_app(state), &config).await
}
