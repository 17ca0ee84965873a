//! miroteams binary entry point

use miroteams::{AppState, config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often expired sessions are swept from the store
const SESSION_PURGE_INTERVAL_SECS: u64 = 300;

/// Application entry point
///
/// # Setup
/// 1. Initialize tracing/logging
/// 2. Load configuration from file and environment
/// 3. Initialize AppState
/// 4. Build Axum router
/// 5. Start HTTP server
/// 6. Start background tasks (session purge)
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize tracing/logging
    let log_format =
        std::env::var("MIROTEAMS__LOGGING__FORMAT").unwrap_or_else(|_| "pretty".to_string());

    if log_format == "json" {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "miroteams=info,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "miroteams=info,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    tracing::info!("Starting miroteams...");

    // 2. Initialize metrics
    miroteams::metrics::init_metrics();

    // 3. Load configuration
    let config = config::AppConfig::load()?;
    tracing::info!(
        domain = %config.server.domain,
        protocol = %config.server.protocol,
        "Configuration loaded"
    );

    // 4. Initialize application state
    let state = AppState::new(config.clone()).await?;

    // 5. Build Axum router
    let app = miroteams::build_router(state.clone());

    // 6. Start HTTP server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Public URL: {}", config.server.base_url());
    tracing::info!(
        redirect_uri = %state.miro.redirect_uri(),
        "Miro OAuth callback"
    );

    // 7. Start background tasks
    spawn_session_purge_task(state.clone());

    // Start server
    axum::serve(listener, app).await?;

    Ok(())
}

/// Spawn background task dropping expired sessions
fn spawn_session_purge_task(state: AppState) {
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(SESSION_PURGE_INTERVAL_SECS));

        // Consume the immediate first tick
        interval.tick().await;

        loop {
            interval.tick().await;

            match state.sessions.purge_expired().await {
                Ok(0) => {}
                Ok(removed) => tracing::info!(removed, "Expired sessions purged"),
                Err(error) => tracing::error!(%error, "Session purge failed"),
            }
        }
    });

    tracing::info!("Session purge task spawned");
}
