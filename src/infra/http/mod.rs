//! HTTP surface: router, handlers, wire models, error mapping.

pub mod error;
pub mod handlers;
pub mod models;
pub mod state;

pub use state::AppState;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::signal;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/pastes", post(handlers::create_paste))
        .route("/api/pastes/top", get(handlers::list_top))
        .route("/api/pastes/recent", get(handlers::list_recent))
        .route(
            "/api/pastes/{slug}",
            get(handlers::get_paste).put(handlers::update_paste),
        )
        .route("/health", get(handlers::health))
        .with_state(state)
}

/// Resolves on SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!(%error, "failed to install ctrl-c handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => tracing::error!(%error, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
