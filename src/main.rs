mod app;
mod auth;
mod config;
mod db;
mod error;
mod foods;
mod meals;
mod oracle;
mod state;
mod usage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "glycemind=debug,axum=info,tower_http=info".to_string());
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

    let state = state::AppState::init().await?;
    tracing::info!(
        foods = state.catalog.len(),
        daily_limit = state.usage.daily_limit(),
        oracle = state.config.oracle.is_some(),
        "state ready"
    );

    app::serve(app::build_app(state)).await
}
