use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{error, info, warn};

use sbweb_api::{auth::ConfigAuthenticator, state::AppState};
use sbweb_shared::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env
    dotenvy::dotenv().ok();

    // Initialize telemetry
    sbweb_shared::telemetry::init_telemetry()?;

    info!("SBWeb server starting...");

    // Load configuration
    let config = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Connect session manager
    let sessions = match sbweb_session::connect_from_settings(&config.session).await {
        Ok(sessions) => sessions,
        Err(e) => {
            error!("Can't start session manager: {}", e);
            std::process::exit(1);
        }
    };
    info!("Connected to session manager");

    if config.accounts.is_empty() {
        warn!("No accounts configured, every login will be rejected");
    }

    let state = AppState {
        sessions,
        authenticator: Arc::new(ConfigAuthenticator::new(&config.accounts)),
        cookie: config.cookie.clone(),
    };
    let app = sbweb_api::router(state);

    // Bind address
    let host: std::net::IpAddr = config.app.host.parse()?;
    let addr = SocketAddr::from((host, config.app.port));
    info!("Listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Got SIGINT, shutting down"),
        _ = terminate => info!("Got SIGTERM, shutting down"),
    }
}
