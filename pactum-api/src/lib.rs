//! REST API for Pactum
//!
//! Escrow lifecycle, ledger and registry routes over a shared
//! [`EscrowManager`](escrow_engine::EscrowManager). Callers are identified by
//! the `x-caller-identity` header set by the upstream authenticator.

pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

use axum::routing::get;
use axum::Router;
use pactum_core::Settings;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use error::AppError;
pub use state::AppState;

/// Build the full router
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(routes::escrow::router())
        .merge(routes::ledger::router())
        .merge(routes::registry::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// Errors that stop the server
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("registry setup failed: {0}")]
    Registry(#[from] escrow_engine::RegistryError),

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Bind and serve until the process is stopped
pub async fn serve(settings: Settings) -> Result<(), ServeError> {
    let addr = settings.bind_address();
    let state = AppState::from_settings(settings)?;

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Pactum API listening on {}", listener.local_addr()?);

    axum::serve(listener, app(state)).await?;

    Ok(())
}
