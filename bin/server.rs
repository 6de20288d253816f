// Quotable - Web Server
// REST API with Axum

use anyhow::{Context, Result};
use quotable::{http, init_tracing, Config, DataSource, MemoryStore, QuoteQueryService};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = Config::from_env()?;
    info!("🌐 Quotable server v{}", quotable::VERSION);

    let opened = config.data_source.open()?;
    let service = QuoteQueryService::new(opened.as_store());

    if let Some(store) = opened.reloadable() {
        spawn_reload_on_hangup(store, config.data_source.clone());
    }

    let app = http::router(service);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("🚀 Server running on http://{}", addr);
    info!("   Data source: {}", config.data_source.path().display());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Re-read the dataset file on SIGHUP; a failed reload keeps the current snapshot
#[cfg(unix)]
fn spawn_reload_on_hangup(store: Arc<MemoryStore>, source: DataSource) {
    use tokio::signal::unix::{signal, SignalKind};
    use tracing::warn;

    tokio::spawn(async move {
        let mut hangups = match signal(SignalKind::hangup()) {
            Ok(stream) => stream,
            Err(e) => {
                warn!("SIGHUP reload disabled: {}", e);
                return;
            }
        };

        while hangups.recv().await.is_some() {
            info!("SIGHUP received, reloading {}", source.path().display());

            let path = source.path().to_path_buf();
            let loaded = tokio::task::spawn_blocking(move || quotable::load_path(&path)).await;

            match loaded {
                Ok(Ok(dataset)) => {
                    if let Err(e) = store.reload(dataset) {
                        warn!("Reload failed, keeping current data: {}", e);
                    }
                }
                Ok(Err(e)) => warn!("Reload failed, keeping current data: {:#}", e),
                Err(e) => warn!("Reload task failed: {}", e),
            }
        }
    });
}

#[cfg(not(unix))]
fn spawn_reload_on_hangup(_store: Arc<MemoryStore>, _source: DataSource) {}
