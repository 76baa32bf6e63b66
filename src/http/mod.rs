//! Callback HTTP surface
//!
//! The remote ledger reaches back into this process over plain HTTP:
//! transaction completions, the three asset steps, and the authorization
//! redirect. Handlers parse, forward to the coordinator/registry, and shape
//! replies; no business logic lives here.

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tracing::info;

use crate::auth::AuthFlow;
use crate::config::CallbackConfig;
use crate::escrow::registry::AssetRegistry;
use crate::txn::coordinator::TransactionCoordinator;

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<TransactionCoordinator>,
    pub registry: Arc<AssetRegistry>,
    pub auth: Arc<AuthFlow>,
}

pub async fn run_server(cfg: &CallbackConfig, state: AppState) -> anyhow::Result<()> {
    let app = Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/callback/transaction",
            post(handlers::transaction_completed),
        )
        .route("/callback/asset/enact", post(handlers::asset_enact))
        .route("/callback/asset/consume", post(handlers::asset_consume))
        .route("/callback/asset/cancel", post(handlers::asset_cancel))
        .route("/callback/authorize", get(handlers::authorize_return));

    // SECURITY: dev-only simulation of ledger callbacks. The mock-api
    // feature must be off in production builds.
    #[cfg(feature = "mock-api")]
    let app = {
        tracing::warn!("mock-api feature enabled; /internal/mock routes are live");
        app.nest(
            "/internal/mock",
            Router::new().route("/complete", post(handlers::mock_complete)),
        )
    };

    let app = app.with_state(state);

    let addr = format!("{}:{}", cfg.host, cfg.port);
    info!("Callback server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
