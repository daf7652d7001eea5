mod app;
mod banner;
mod classify;
mod config;
mod error;
mod filename;
mod sniff;
mod storage;
mod telemetry;
mod upload;

use crate::{
    app::{router, AppState},
    config::{Args, Config},
    error::AppError,
};
use clap::Parser;
use dotenv::dotenv;
use tokio::net::TcpListener;

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenv().ok();

    let args = Args::parse();
    telemetry::init_logging()
        .map_err(|e| AppError::Internal(format!("Failed to initialize logging: {}", e)))?;

    let config = Config::load(&args).await?;
    tracing::debug!(
        mode = ?config.mode,
        upload_root = %config.upload_root.display(),
        max_upload_size = ?config.max_upload_size,
        tagging = config.tagger.is_some(),
        "configuration loaded"
    );

    let listener = TcpListener::bind(config.listen_addr())
        .await
        .map_err(|e| {
            AppError::Internal(format!("Failed to bind to {}: {}", config.listen_addr(), e))
        })?;

    if config.banner {
        banner::announce(&config).await;
    }

    let app = router(AppState::from(&config), config.max_upload_size);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}
