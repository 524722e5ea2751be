mod app;
mod auth;
mod catalog;
mod config;
mod error;
mod membership;
mod recipes;
mod seed;
mod shopping_list;
mod state;
mod store;
mod users;

#[cfg(test)]
mod testing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "foodgram=debug,axum=info,tower_http=info".to_string());
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

    if let Some(path) = &state.config.seed_file {
        seed::load_file(state.store.as_ref(), path).await?;
    }

    let config = state.config.clone();
    app::serve(app::build_app(state), &config).await
}
