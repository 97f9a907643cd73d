// Lookbook server - REST API over the social graph engine

use tokio::net::TcpListener;
use tracing::info;

use lookbook::{api, app_state::AppState, config::Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration (refuses to start without a token secret)
    let config = Config::from_env()?;

    // Initialize application state
    let app_state = AppState::new(config.clone()).await?;

    // Build the application router
    let app = api::router(app_state);

    let addr = config.server_address();
    info!("Server listening on http://{}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
