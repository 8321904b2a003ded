use anyhow::{Context, Result};
use axum::Router;
use std::{io::ErrorKind, path::Path};
use tokio::{fs, net::TcpListener};
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;
mod storage;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // --- Parse config ---
    let cfg = config::AppConfig::from_env_and_args()?;

    tracing::info!("binnit {} -- starting", env!("CARGO_PKG_VERSION"));
    tracing::info!("  + serving pastes on: {}", cfg.server_prefix);
    tracing::info!("  + listening on: {}", cfg.addr());
    tracing::info!("  + paste_dir: {}", cfg.paste_dir.display());
    tracing::info!("  + templ_dir: {}", cfg.templ_dir.display());
    tracing::info!("  + static_dir: {}", cfg.static_dir.display());
    tracing::info!("  + storage: {}", cfg.storage);
    tracing::info!("  + max_size: {}", cfg.max_size);

    // --- Ensure paste directory exists ---
    ensure_dir(&cfg.paste_dir).await?;

    // --- Initialize storage backend and service ---
    let backend = storage::open_backend(&cfg.storage, cfg.paste_dir.clone())
        .await
        .with_context(|| format!("opening `{}` storage", cfg.storage))?;
    let service = services::paste_service::PasteService::new(backend, cfg.clone());

    // --- Build router ---
    let app: Router = routes::routes::routes(service.clone());

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    service.flush().await?;
    tracing::info!("binnit stopped");

    Ok(())
}

/// Create the paste directory if it is missing. The store itself never does.
async fn ensure_dir(path: &Path) -> Result<()> {
    if fs::metadata(path).await.is_err() {
        fs::create_dir_all(path)
            .await
            .with_context(|| format!("creating paste directory {}", path.display()))?;
        tracing::info!("Created paste directory at {}", path.display());
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
