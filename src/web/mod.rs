mod error;
mod extractors;
mod flash;
mod handlers;
mod routes;
pub mod security;
mod state;

pub use state::AppState;

use crate::storage::{BlobStore, LocalBlobStore};
use crate::{Config, Database};
use anyhow::Result;
use axum::middleware;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

const CLEANUP_INTERVAL: Duration = Duration::from_secs(600);

pub fn router(state: Arc<AppState>) -> Router {
    let storage = &state.config.storage;
    let mut app = Router::new()
        .merge(routes::public_routes())
        .merge(routes::auth_routes())
        .merge(routes::admin_routes(state.config.max_upload_bytes()));

    // An absolute public URL means blobs are served by someone else.
    let mount = storage.public_url.trim_end_matches('/');
    if mount.starts_with('/') {
        app = app.nest_service(mount, ServeDir::new(&storage.root));
    }

    app.fallback(handlers::public::fallback)
        .layer(middleware::from_fn(security::apply_security_headers))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(config: Config, db: Database, addr: &str) -> Result<()> {
    let blobs: Arc<dyn BlobStore> = Arc::new(LocalBlobStore::new(
        &config.storage.root,
        &config.storage.public_url,
    ));
    let state = Arc::new(AppState::new(config, db, blobs)?);

    let sweeper = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            let expired = sweeper.sessions.cleanup();
            sweeper.login_limiter.cleanup();
            if expired > 0 {
                tracing::debug!(expired, "Removed expired sessions");
            }
        }
    });

    let app = router(state);
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
