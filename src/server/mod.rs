//! HTTP surface: routing, handlers, error mapping and request logging.

mod error;
mod handlers;
mod logging;
mod params;

pub use error::ApiError;
pub use params::FeedParams;

use axum::middleware;
use axum::routing::get;
use axum::Router;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::feed::FeedFetcher;
use crate::filter::ProbeClient;
use crate::podcast::PodcastService;

/// Shared, process-wide handles used by every request.
#[derive(Clone)]
pub struct AppState {
    pub fetcher: Arc<FeedFetcher>,
    pub probes: Arc<ProbeClient>,
    pub podcasts: Arc<PodcastService>,
}

pub fn build_router(state: AppState, media_dir: &Path) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/rss", get(handlers::rss))
        .route("/podcast", get(handlers::podcast))
        .nest_service("/media", ServeDir::new(media_dir))
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(middleware::from_fn(logging::log_requests))
}

/// Serves `router` on `listener` until SIGINT or SIGTERM.
pub async fn serve(listener: TcpListener, router: Router) -> std::io::Result<()> {
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
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
        _ = ctrl_c => tracing::info!("SIGINT received, shutting down"),
        _ = terminate => tracing::info!("SIGTERM received, shutting down"),
    }
}
