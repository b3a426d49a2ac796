//! Lexiscribe server entry point.

use std::net::SocketAddr;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use lexiscribe_config::load_settings;
use lexiscribe_server::{create_router, init_metrics, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config_path = std::env::var("LEXISCRIBE_CONFIG").ok();
    let settings = load_settings(config_path.as_deref())?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting lexiscribe server");

    let prometheus_handle = init_metrics();
    let addr = SocketAddr::from(([0, 0, 0, 0], settings.server.port));

    let state = AppState::new(settings, prometheus_handle)?;
    let app = create_router(state);

    tracing::info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    tracing::info!("server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}

fn init_tracing() {
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "lexiscribe=info,tower_http=debug".into());

    tracing_subscriber::registry().with(env_filter).with(tracing_subscriber::fmt::layer()).init();
}
