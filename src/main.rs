//! Crash Arena Server - authoritative telnet game server
//!
//! This is the main entry point. It handles:
//! - Telnet connections for real-time play
//! - The lobby that groups players into rounds
//! - An HTTP status endpoint for health checks

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crash_arena::app::AppState;
use crash_arena::config::Config;
use crash_arena::game::sprites::SpriteSet;
use crash_arena::http::build_router;
use crash_arena::net::session::accept_loop;
use crash_arena::util::time::init_server_time;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    // Initialize server time tracking
    init_server_time();

    info!("Starting Crash Arena Server");

    // Sprites are loaded once and shared by every round
    let sprites = SpriteSet::from_dir(config.assets_dir.as_deref())?;
    if let Some(dir) = &config.assets_dir {
        info!(dir = %dir.display(), "Loaded sprites");
    }

    let state = AppState::new(config.clone(), sprites);

    // Start the telnet listener
    let game_listener = TcpListener::bind(config.game_addr).await?;
    info!("Telnet listening on {}", config.game_addr);

    let lobby = state.lobby.clone();
    let sprites = state.sprites.clone();
    tokio::spawn(async move {
        if let Err(e) = accept_loop(game_listener, lobby, sprites).await {
            error!(error = %e, "Telnet listener failed");
        }
    });

    // Start the status endpoint
    let router = build_router(state);
    let status_listener = TcpListener::bind(config.status_addr).await?;

    info!("Health check: http://{}/health", config.status_addr);

    axum::serve(status_listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
