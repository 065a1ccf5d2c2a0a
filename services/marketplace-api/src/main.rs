use std::path::PathBuf;

use marketplace_api::config::Config;
use marketplace_api::router::build_router;
use marketplace_api::state::AppState;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt::init();

    tracing::info!("Starting marketplace API service");

    let config = match config_path() {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };
    let bind_address = config.bind_address.clone();

    let state = AppState::in_memory(config);
    let app = build_router(state);

    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!("Listening on {}", bind_address);
    axum::serve(listener, app).await?;

    Ok(())
}

fn config_path() -> Option<PathBuf> {
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var("MARKETPLACE_API_CONFIG").ok())
        .map(PathBuf::from)
}
